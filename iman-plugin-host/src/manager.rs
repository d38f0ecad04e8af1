//! Extension registry: discovery, trust gate, lifecycle and capability
//! aggregation.
//!
//! Records are kept in load order. Every call into extension code runs behind
//! a panic guard, so a misbehaving extension fails its own load or is skipped
//! for one aggregation pass without taking the host down.

use crate::catalog::ExtensionCatalog;
use crate::descriptor::{ArtifactDescriptor, is_candidate_name};
use crate::error::ExtensionHostError;
use crate::proxy::{HostContext, HostProxy};
use crate::signature;
use iman_plugin_sdk::{
    CommandResult, DashboardWidget, Extension, ExtensionError, ExtensionManifest, Host, LicenseInfo,
    MenuItem, ReportItem, ToolbarItem,
};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the backup area inside the extension directory.
pub const BACKUP_DIR_NAME: &str = "backup";

/// Reserved marker file identifying the extension directory.
pub const PACKAGE_MARKER: &str = "__init__.toml";

/// A loaded extension.
pub struct ExtensionRecord {
    pub id: String,
    pub manifest: ExtensionManifest,
    pub source_path: PathBuf,
    pub enabled: bool,
    pub(crate) instance: Box<dyn Extension>,
}

impl fmt::Debug for ExtensionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRecord")
            .field("id", &self.id)
            .field("manifest", &self.manifest)
            .field("source_path", &self.source_path)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Contribution kinds an extension can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Menu,
    Toolbar,
    DashboardWidget,
    Report,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [Self::Menu, Self::Toolbar, Self::DashboardWidget, Self::Report];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Toolbar => "toolbar",
            Self::DashboardWidget => "dashboard",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "menu" => Ok(Self::Menu),
            "toolbar" => Ok(Self::Toolbar),
            "dashboard" | "widget" | "dashboard_widget" => Ok(Self::DashboardWidget),
            "report" => Ok(Self::Report),
            other => Err(format!("unknown capability kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributionItem {
    Menu(MenuItem),
    Toolbar(ToolbarItem),
    DashboardWidget(DashboardWidget),
    Report(ReportItem),
}

impl ContributionItem {
    pub fn title(&self) -> &str {
        match self {
            Self::Menu(item) => &item.title,
            Self::Toolbar(item) => &item.title,
            Self::DashboardWidget(item) => &item.title,
            Self::Report(item) => &item.title,
        }
    }

    /// Command routed back to the contributing extension.
    pub fn command(&self) -> &str {
        match self {
            Self::Menu(item) => &item.command,
            Self::Toolbar(item) => &item.command,
            Self::DashboardWidget(item) => &item.command,
            Self::Report(item) => &item.command,
        }
    }
}

/// One aggregated item, tagged with the extension that declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub extension_id: String,
    pub item: ContributionItem,
}

/// Owns every loaded extension and the directory they are installed in.
pub struct ExtensionRegistry {
    pub(crate) extension_dir: PathBuf,
    pub(crate) backup_dir: PathBuf,
    pub(crate) scratch_root: PathBuf,
    catalog: ExtensionCatalog,
    context: HostContext,
    records: Vec<ExtensionRecord>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extension_dir", &self.extension_dir)
            .field("catalog", &self.catalog)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl ExtensionRegistry {
    /// Opens the registry over `extension_dir`, creating the directory, its
    /// backup area and the package marker if absent.
    pub fn new(
        extension_dir: impl Into<PathBuf>,
        catalog: ExtensionCatalog,
        context: HostContext,
    ) -> Result<Self, ExtensionHostError> {
        let extension_dir = extension_dir.into();
        let backup_dir = extension_dir.join(BACKUP_DIR_NAME);
        fs::create_dir_all(&backup_dir)?;

        let marker = extension_dir.join(PACKAGE_MARKER);
        if !marker.exists() {
            fs::write(&marker, "# Iman Accounting extension directory\n")?;
            debug!(path = %marker.display(), "Created extension package marker");
        }

        Ok(Self {
            extension_dir,
            backup_dir,
            scratch_root: std::env::temp_dir(),
            catalog,
            context,
            records: Vec::new(),
        })
    }

    /// Extracts archives under `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = dir.into();
        self
    }

    pub fn extension_dir(&self) -> &Path {
        &self.extension_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn catalog(&self) -> &ExtensionCatalog {
        &self.catalog
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    /// Publishes a license change to every loaded extension's host handle.
    pub fn set_license(&self, info: LicenseInfo) {
        self.context.set_license(info);
    }

    // ================================================================
    // Discovery / Loading
    // ================================================================

    /// Loads every candidate artifact in the extension directory and returns
    /// how many loaded. A failing artifact is logged and skipped.
    pub fn discover(&mut self) -> Result<usize, ExtensionHostError> {
        let candidates = candidate_files(&self.extension_dir)?;

        let mut loaded = 0;
        for path in &candidates {
            match self.load_one(path) {
                Ok(_) => loaded += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping extension artifact");
                }
            }
        }

        info!(
            dir = %self.extension_dir.display(),
            candidates = candidates.len(),
            loaded,
            "Extension discovery complete"
        );
        Ok(loaded)
    }

    /// Verifies, instantiates and registers the extension named by the
    /// artifact at `path`, then runs its load and enable hooks.
    ///
    /// Nothing is registered unless every step succeeds. A record with the
    /// same id is replaced in place.
    pub fn load_one(&mut self, path: &Path) -> Result<String, ExtensionHostError> {
        let artifact = artifact_name(path);
        let text = fs::read_to_string(path)?;

        if !signature::verify(&text) {
            return Err(ExtensionHostError::SignatureMissing(artifact));
        }

        let descriptor = ArtifactDescriptor::parse(&text)?;
        let entry_name = descriptor
            .entry
            .ok_or_else(|| ExtensionHostError::MissingEntryPoint {
                artifact: artifact.clone(),
                detail: "descriptor has no `entry` key".to_string(),
            })?;
        let entry = *self
            .catalog
            .get(&entry_name)
            .ok_or_else(|| ExtensionHostError::MissingEntryPoint {
                artifact: artifact.clone(),
                detail: format!("no registered entry point named '{entry_name}'"),
            })?;

        let load_failure = |message: String| ExtensionHostError::LoadFailure {
            artifact: artifact.clone(),
            message,
        };

        let mut instance = guarded(|| entry.instantiate()).map_err(&load_failure)?;
        let manifest = guarded(|| instance.manifest()).map_err(&load_failure)?;
        let id = manifest.id();

        let host: Arc<dyn Host> = Arc::new(HostProxy::new(id.clone(), self.context.clone()));
        match guarded(|| -> Result<(), ExtensionError> {
            instance.on_load(host)?;
            instance.on_enable()
        }) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(load_failure(e.to_string())),
            Err(panic_message) => return Err(load_failure(panic_message)),
        }

        let record = ExtensionRecord {
            id: id.clone(),
            manifest,
            source_path: path.to_path_buf(),
            enabled: true,
            instance,
        };

        match self.records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                *existing = record;
                info!(extension_id = %id, artifact = %artifact, "Extension reloaded");
            }
            None => {
                self.records.push(record);
                info!(extension_id = %id, artifact = %artifact, "Extension loaded");
            }
        }
        Ok(id)
    }

    // ================================================================
    // Record access
    // ================================================================

    pub fn list(&self) -> &[ExtensionRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Result<&ExtensionRecord, ExtensionHostError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ExtensionHostError::ExtensionNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ExtensionRecord, ExtensionHostError> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ExtensionHostError::ExtensionNotFound(id.to_string()))
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ================================================================
    // Lifecycle
    // ================================================================

    /// Sets the enabled flag and runs the matching hook.
    ///
    /// The flag is kept even if the hook fails; the failure is returned.
    /// Setting the current state again is a no-op.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), ExtensionHostError> {
        let record = self.get_mut(id)?;
        if record.enabled == enabled {
            debug!(extension_id = %id, enabled, "Extension already in requested state");
            return Ok(());
        }
        record.enabled = enabled;

        let hook = if enabled { "on_enable" } else { "on_disable" };
        let instance = &mut record.instance;
        let outcome = guarded(|| {
            if enabled {
                instance.on_enable()
            } else {
                instance.on_disable()
            }
        });

        let message = match outcome {
            Ok(Ok(())) => {
                info!(extension_id = %id, enabled, "Extension state changed");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic_message) => panic_message,
        };
        warn!(extension_id = %id, hook, error = %message, "Extension hook failed");
        Err(ExtensionHostError::HookFailed {
            extension_id: id.to_string(),
            hook,
            message,
        })
    }

    /// Flips the enabled flag and returns the new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool, ExtensionHostError> {
        let enabled = !self.get(id)?.enabled;
        self.set_enabled(id, enabled)?;
        Ok(enabled)
    }

    // ================================================================
    // Capability aggregation / command routing
    // ================================================================

    /// Collects `kind` items from every enabled extension in load order.
    /// An extension that fails to produce its items is skipped.
    pub fn aggregate(&self, kind: CapabilityKind) -> Vec<Contribution> {
        let mut contributions = Vec::new();

        for record in self.records.iter().filter(|r| r.enabled) {
            let instance = record.instance.as_ref();
            let message = match guarded(|| collect(instance, kind)) {
                Ok(Ok(items)) => {
                    contributions.extend(items.into_iter().map(|item| Contribution {
                        extension_id: record.id.clone(),
                        item,
                    }));
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic_message) => panic_message,
            };
            warn!(extension_id = %record.id, kind = %kind, error = %message, "Skipping extension contributions");
        }

        contributions
    }

    /// Runs `command` on an enabled extension.
    pub fn execute(
        &mut self,
        id: &str,
        command: &str,
        args: &serde_json::Value,
    ) -> Result<CommandResult, ExtensionHostError> {
        let record = self.get_mut(id)?;
        if !record.enabled {
            return Err(ExtensionHostError::ExtensionDisabled(id.to_string()));
        }

        let instance = &mut record.instance;
        let result = guarded(|| instance.execute(command, args)).map_err(|message| {
            ExtensionHostError::HookFailed {
                extension_id: id.to_string(),
                hook: "execute",
                message,
            }
        })?;
        debug!(extension_id = %id, command, success = result.success, "Extension command executed");
        Ok(result)
    }
}

fn collect(extension: &dyn Extension, kind: CapabilityKind) -> Result<Vec<ContributionItem>, ExtensionError> {
    Ok(match kind {
        CapabilityKind::Menu => extension.menu_items()?.into_iter().map(ContributionItem::Menu).collect(),
        CapabilityKind::Toolbar => extension.toolbar_items()?.into_iter().map(ContributionItem::Toolbar).collect(),
        CapabilityKind::DashboardWidget => extension
            .dashboard_widgets()?
            .into_iter()
            .map(ContributionItem::DashboardWidget)
            .collect(),
        CapabilityKind::Report => extension.reports()?.into_iter().map(ContributionItem::Report).collect(),
    })
}

/// Top-level candidate artifacts in `dir`, sorted by path.
pub(crate) fn candidate_files(dir: &Path) -> Result<Vec<PathBuf>, ExtensionHostError> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| entry.file_name().to_str().is_some_and(is_candidate_name))
        .map(|entry| entry.path())
        .collect();
    candidates.sort();
    Ok(candidates)
}

pub(crate) fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs extension code, converting a panic into its message.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
