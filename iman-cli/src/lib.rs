//! Startup wiring for the `iman` binary.
//!
//! [`App::start`] runs the application's startup sequence: load the license
//! from its slot files, then open the extension directory and load every
//! admissible extension. The methods on [`App`] back the CLI subcommands.

use anyhow::{Context, Result, bail};
use iman_extensions::builtin_catalog;
use iman_license::{LicenseIssuer, LicenseState, LicenseStore, LicenseTier, LicenseToken, LicenseValidator};
use iman_plugin_host::{
    CONFIG_FILE_NAME, CapabilityKind, Contribution, ExtensionRegistry, HostConfig, HostContext, ImportReport,
    MemoryLedger, license_info,
};
use iman_plugin_sdk::CommandResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Picks the configuration file: an explicit path, else `./iman.toml`, else
/// `iman/iman.toml` in the user's config directory if present.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("iman").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
        .unwrap_or(local)
}

/// Parameters for minting a license for another machine.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub hardware_id: String,
    pub tier: LicenseTier,
    /// Validity override for trial and professional licenses.
    pub days: Option<i64>,
    /// Institution name, required for site licenses.
    pub site_name: Option<String>,
}

pub struct App {
    config: HostConfig,
    store: LicenseStore,
    license: LicenseState,
    registry: ExtensionRegistry,
}

impl App {
    /// Starts with this machine's hardware fingerprint.
    pub fn start(config: HostConfig) -> Result<Self> {
        Self::start_with(config, LicenseValidator::for_current_machine())
    }

    pub fn start_with(config: HostConfig, validator: LicenseValidator) -> Result<Self> {
        let store = LicenseStore::new(&config.license_dir, validator);
        let license = store.load();
        info!(tier = %license.tier, "License state loaded");

        let ledger = Arc::new(MemoryLedger::with_default_chart());
        let context = HostContext::new(ledger, license_info(&license)).with_settings(config.settings.clone());
        let mut registry = ExtensionRegistry::new(&config.extension_dir, builtin_catalog(), context)
            .with_context(|| format!("Failed to open extension directory {}", config.extension_dir.display()))?;
        registry.discover().context("Failed to scan extension directory")?;

        Ok(Self {
            config,
            store,
            license,
            registry,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn license(&self) -> &LicenseState {
        &self.license
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn fingerprint(&self) -> &str {
        self.store.validator().fingerprint().id()
    }

    // ================================================================
    // Licensing
    // ================================================================

    /// Validates and stores `token`, then publishes the new state to loaded
    /// extensions.
    pub fn activate(&mut self, token: &str) -> Result<&LicenseState> {
        let state = self.store.activate(token).context("License rejected")?;
        self.registry.set_license(license_info(&state));
        self.license = state;
        Ok(&self.license)
    }

    /// Mints a license. Requires an active administrator license.
    pub fn issue(&self, request: &IssueRequest) -> Result<LicenseToken> {
        if !self.license.can_issue_licenses() {
            bail!(
                "Issuing licenses requires an administrator license (current: {})",
                self.license.tier.label()
            );
        }

        let issuer = LicenseIssuer::new(self.store.validator().secrets().clone());
        let token = match request.tier {
            LicenseTier::Admin => issuer.issue_admin(&request.hardware_id)?,
            LicenseTier::Site => {
                let Some(site_name) = request.site_name.as_deref() else {
                    bail!("A site name is required for site licenses");
                };
                issuer.issue_site(&request.hardware_id, site_name)?
            }
            tier => issuer.issue_user(&request.hardware_id, tier, request.days)?,
        };
        info!(tier = %request.tier, hwid = %request.hardware_id, "License issued");
        Ok(token)
    }

    // ================================================================
    // Extensions
    // ================================================================

    pub fn import(&mut self, path: &Path) -> Result<ImportReport> {
        self.registry
            .import_artifact(path)
            .with_context(|| format!("Failed to import {}", path.display()))
    }

    /// Aggregated items of one kind, or of every kind in kind order.
    pub fn items(&self, kind: Option<CapabilityKind>) -> Vec<(CapabilityKind, Contribution)> {
        let kinds: Vec<CapabilityKind> = match kind {
            Some(kind) => vec![kind],
            None => CapabilityKind::ALL.to_vec(),
        };
        kinds
            .into_iter()
            .flat_map(|kind| self.registry.aggregate(kind).into_iter().map(move |c| (kind, c)))
            .collect()
    }

    pub fn run(&mut self, id: &str, command: &str, args: &serde_json::Value) -> Result<CommandResult> {
        self.registry
            .execute(id, command, args)
            .with_context(|| format!("Failed to run '{command}' on {id}"))
    }
}

/// Human-readable summary of a license state.
pub fn status_lines(state: &LicenseState) -> Vec<String> {
    let mut lines = vec![
        format!("Hardware ID: {}", state.hardware_id),
        format!("License:     {}", state.tier.label()),
    ];
    if let Some(slot) = state.slot {
        lines.push(format!("Slot:        {}", slot.file_name()));
    }
    if state.is_admin {
        lines.push("Administrator: may issue licenses".to_string());
    }
    if state.is_site {
        lines.push("Site license: unlimited access".to_string());
    }
    lines
}
