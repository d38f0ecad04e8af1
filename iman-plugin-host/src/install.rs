//! Artifact import: single descriptors and zip archives.
//!
//! Installing a descriptor rotates any same-named live file into the backup
//! area before copying the new one in. If the new file then fails to load it
//! is removed again; the backup is left for the operator.

use chrono::Local;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::ZipArchive;

use crate::descriptor::ArtifactKind;
use crate::error::ExtensionHostError;
use crate::manager::{ExtensionRegistry, artifact_name, candidate_files};
use crate::signature;

/// Prefix of scratch directories used while importing archives.
pub const SCRATCH_PREFIX: &str = "iman-import-";

/// A file copied into the extension directory and loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledExtension {
    pub file_name: String,
    pub extension_id: String,
    /// Where the previous live file went, if one was replaced.
    pub backup: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ImportFailure {
    pub file_name: String,
    pub error: ExtensionHostError,
}

/// Outcome of an import. Archives may partially succeed.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<InstalledExtension>,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.imported.is_empty()
    }
}

/// Backup file name for `file_name` at the current local time.
pub fn backup_file_name(file_name: &str) -> String {
    format!("{file_name}.backup_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

impl ExtensionRegistry {
    /// Imports a descriptor or an archive of descriptors.
    pub fn import_artifact(&mut self, path: &Path) -> Result<ImportReport, ExtensionHostError> {
        match ArtifactKind::from_path(path) {
            Some(ArtifactKind::Descriptor) => {
                let installed = self.install_single_file(path)?;
                Ok(ImportReport {
                    imported: vec![installed],
                    failures: Vec::new(),
                })
            }
            Some(ArtifactKind::Archive) => self.install_archive(path),
            None => Err(ExtensionHostError::UnsupportedArtifactFormat(artifact_name(path))),
        }
    }

    /// Copies a signed descriptor into the extension directory and loads it.
    pub fn install_single_file(&mut self, path: &Path) -> Result<InstalledExtension, ExtensionHostError> {
        let file_name = artifact_name(path);
        if !signature::verify_file(path) {
            return Err(ExtensionHostError::SignatureMissing(file_name));
        }

        let destination = self.extension_dir.join(&file_name);
        if is_same_file(path, &destination) {
            let extension_id = self.load_one(&destination)?;
            return Ok(InstalledExtension {
                file_name,
                extension_id,
                backup: None,
            });
        }

        let backup = if destination.exists() {
            Some(self.rotate_to_backup(&destination, &file_name)?)
        } else {
            None
        };

        fs::copy(path, &destination)?;
        match self.load_one(&destination) {
            Ok(extension_id) => {
                info!(file = %file_name, extension_id = %extension_id, "Extension installed");
                Ok(InstalledExtension {
                    file_name,
                    extension_id,
                    backup,
                })
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&destination) {
                    warn!(path = %destination.display(), error = %rm, "Failed to remove rejected extension file");
                }
                Err(e)
            }
        }
    }

    /// Extracts `path` to a scratch directory and installs every top-level
    /// descriptor in it. The scratch directory is removed on every exit path.
    pub fn install_archive(&mut self, path: &Path) -> Result<ImportReport, ExtensionHostError> {
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)?;
        let mut archive = ZipArchive::new(File::open(path)?)?;
        archive.extract(scratch.path())?;

        let mut report = ImportReport::default();
        for candidate in candidate_files(scratch.path())? {
            match self.install_single_file(&candidate) {
                Ok(installed) => report.imported.push(installed),
                Err(error) => {
                    let file_name = artifact_name(&candidate);
                    warn!(archive = %path.display(), file = %file_name, error = %error, "Archive member rejected");
                    report.failures.push(ImportFailure { file_name, error });
                }
            }
        }

        info!(
            archive = %path.display(),
            imported = report.imported.len(),
            failed = report.failures.len(),
            "Archive import finished"
        );
        Ok(report)
    }

    /// Copies the live file into the backup area under a timestamped name,
    /// then removes it.
    fn rotate_to_backup(&self, live: &Path, file_name: &str) -> Result<PathBuf, ExtensionHostError> {
        fs::create_dir_all(&self.backup_dir)?;

        let base = backup_file_name(file_name);
        let mut backup = self.backup_dir.join(&base);
        let mut n = 1;
        while backup.exists() {
            backup = self.backup_dir.join(format!("{base}_{n}"));
            n += 1;
        }

        fs::copy(live, &backup)?;
        fs::remove_file(live)?;
        info!(file = %file_name, backup = %backup.display(), "Previous extension backed up");
        Ok(backup)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
