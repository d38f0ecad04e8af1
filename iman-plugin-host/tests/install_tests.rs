//! Importing single descriptors and archives into the extension directory.

mod common;

use common::*;
use iman_plugin_host::*;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn plugins(root: &Path) -> PathBuf {
    root.join("plugins")
}

fn incoming(root: &Path) -> PathBuf {
    root.join("incoming")
}

/// Registry whose archive extraction happens under `root/scratch`.
fn registry_with_scratch(root: &Path) -> ExtensionRegistry {
    let scratch = root.join("scratch");
    std::fs::create_dir_all(&scratch).unwrap();
    registry(root).with_scratch_root(scratch)
}

fn scratch_dirs(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join("scratch"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(SCRATCH_PREFIX))
        .collect();
    names.sort();
    names
}

fn bundle(root: &Path, members: &[(&str, String)]) -> PathBuf {
    std::fs::create_dir_all(incoming(root)).unwrap();
    let archive = incoming(root).join("bundle.zip");
    write_zip(&archive, members);
    archive
}

// ================================================================
// Dispatch
// ================================================================

#[test]
fn unsupported_extension_has_no_side_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(&incoming(tmp.path()), "ledgerly.py", &signed("ledgerly"));
    let mut registry = registry(tmp.path());

    let err = registry.import_artifact(&path).unwrap_err();
    assert!(matches!(err, ExtensionHostError::UnsupportedArtifactFormat(ref n) if n == "ledgerly.py"));
    assert_eq!(file_names(&plugins(tmp.path())), vec![PACKAGE_MARKER.to_string()]);
    assert!(registry.is_empty());
}

#[test]
fn import_descriptor_installs_and_loads() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(&incoming(tmp.path()), "ledgerly.toml", &signed("ledgerly"));
    let mut registry = registry(tmp.path());

    let report = registry.import_artifact(&path).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.imported,
        vec![InstalledExtension {
            file_name: "ledgerly.toml".into(),
            extension_id: LEDGERLY_ID.into(),
            backup: None,
        }]
    );
    assert!(plugins(tmp.path()).join("ledgerly.toml").is_file());
    assert_eq!(registry.get(LEDGERLY_ID).unwrap().source_path, plugins(tmp.path()).join("ledgerly.toml"));
}

// ================================================================
// Single-file install
// ================================================================

#[test]
fn unsigned_file_is_never_copied() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(&incoming(tmp.path()), "rogue.toml", &unsigned("ledgerly"));
    let mut registry = registry(tmp.path());

    assert!(matches!(
        registry.import_artifact(&path),
        Err(ExtensionHostError::SignatureMissing(_))
    ));
    assert!(!plugins(tmp.path()).join("rogue.toml").exists());
}

#[test]
fn reimport_rotates_exactly_one_backup() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(&incoming(tmp.path()), "ledgerly.toml", &signed("ledgerly"));
    let mut registry = registry(tmp.path());

    registry.import_artifact(&path).unwrap();
    let second = registry.import_artifact(&path).unwrap();

    assert_eq!(registry.len(), 1);
    let backups = file_names(registry.backup_dir());
    assert_eq!(backups.len(), 1);
    assert!(backups[0].starts_with("ledgerly.toml.backup_"));
    assert_eq!(second.imported[0].backup, Some(registry.backup_dir().join(&backups[0])));
    assert!(plugins(tmp.path()).join("ledgerly.toml").is_file());
}

#[test]
fn backups_within_one_second_do_not_collide() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_artifact(&incoming(tmp.path()), "ledgerly.toml", &signed("ledgerly"));
    let mut registry = registry(tmp.path());

    for _ in 0..4 {
        registry.install_single_file(&path).unwrap();
    }
    assert_eq!(file_names(registry.backup_dir()).len(), 3);
    assert_eq!(registry.len(), 1);
}

#[test]
fn failed_load_removes_new_file_and_keeps_backup() {
    let tmp = tempfile::tempdir().unwrap();
    let live = plugins(tmp.path()).join("shared.toml");
    let good = write_artifact(&incoming(tmp.path()), "shared.toml", &signed("ledgerly"));
    let mut registry = registry(tmp.path());
    registry.install_single_file(&good).unwrap();

    let bad = write_artifact(&tmp.path().join("incoming2"), "shared.toml", &signed("fails_on_enable"));
    let err = registry.install_single_file(&bad).unwrap_err();
    assert!(matches!(err, ExtensionHostError::LoadFailure { .. }));

    assert!(!live.exists());
    let backups = file_names(registry.backup_dir());
    assert_eq!(backups.len(), 1);
    let saved = std::fs::read_to_string(registry.backup_dir().join(&backups[0])).unwrap();
    assert_eq!(saved, signed("ledgerly"));
    assert!(registry.is_loaded(LEDGERLY_ID));
}

#[test]
fn installing_the_live_file_reloads_without_backup() {
    let tmp = tempfile::tempdir().unwrap();
    let live = write_artifact(&plugins(tmp.path()), "ledgerly.toml", &signed("ledgerly"));
    let mut registry = registry(tmp.path());
    registry.discover().unwrap();

    let installed = registry.install_single_file(&live).unwrap();
    assert_eq!(installed.backup, None);
    assert!(live.is_file());
    assert!(file_names(registry.backup_dir()).is_empty());
    assert_eq!(registry.len(), 1);
}

// ================================================================
// Archive install
// ================================================================

#[test]
fn archive_with_one_unsigned_member_partially_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(incoming(tmp.path())).unwrap();
    let archive = incoming(tmp.path()).join("bundle.zip");
    write_zip(
        &archive,
        &[
            ("ledgerly.toml", signed("ledgerly")),
            ("reporter.toml", signed("reporter")),
            ("rogue.toml", unsigned("ledgerly")),
        ],
    );
    let mut registry = registry(tmp.path());

    let report = registry.import_artifact(&archive).unwrap();
    assert_eq!(report.imported.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_success());
    assert_eq!(report.failures[0].file_name, "rogue.toml");
    assert!(matches!(report.failures[0].error, ExtensionHostError::SignatureMissing(_)));

    assert_eq!(
        file_names(&plugins(tmp.path())),
        vec![PACKAGE_MARKER.to_string(), "ledgerly.toml".into(), "reporter.toml".into()]
    );
    assert!(registry.is_loaded(LEDGERLY_ID));
    assert!(registry.is_loaded(REPORTER_ID));
}

#[test]
fn archive_ignores_nested_and_reserved_members() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(incoming(tmp.path())).unwrap();
    let archive = incoming(tmp.path()).join("bundle.zip");
    write_zip(
        &archive,
        &[
            ("__init__.toml", signed("ledgerly")),
            ("sub/reporter.toml", signed("reporter")),
            ("README.txt", "hello".to_string()),
            ("ledgerly.toml", signed("ledgerly")),
        ],
    );
    let mut registry = registry(tmp.path());

    let report = registry.import_artifact(&archive).unwrap();
    assert!(report.is_success());
    assert_eq!(report.imported.len(), 1);
    assert!(!registry.is_loaded(REPORTER_ID));
}

#[test]
fn archive_member_failing_to_load_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(incoming(tmp.path())).unwrap();
    let archive = incoming(tmp.path()).join("bundle.zip");
    write_zip(
        &archive,
        &[("boom.toml", signed("panics_on_load")), ("ok.toml", signed("reporter"))],
    );
    let mut registry = registry(tmp.path());

    let report = registry.import_artifact(&archive).unwrap();
    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.failures[0].file_name, "boom.toml");
    assert!(!plugins(tmp.path()).join("boom.toml").exists());
}

#[test]
fn corrupt_archive_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_artifact(&incoming(tmp.path()), "bad.zip", "not a zip");
    let mut registry = registry(tmp.path());

    assert!(matches!(
        registry.import_artifact(&archive),
        Err(ExtensionHostError::Archive(_))
    ));
    assert!(registry.is_empty());
}

// ================================================================
// Scratch directories
// ================================================================

#[test]
fn archives_extract_under_system_temp_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    assert_eq!(registry(tmp.path()).scratch_root(), std::env::temp_dir());
}

#[test]
fn scratch_is_removed_after_successful_import() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = bundle(tmp.path(), &[("ledgerly.toml", signed("ledgerly"))]);
    let mut registry = registry_with_scratch(tmp.path());

    assert!(registry.import_artifact(&archive).unwrap().is_success());
    assert_eq!(scratch_dirs(tmp.path()), Vec::<String>::new());
}

#[test]
fn scratch_is_removed_after_partial_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = bundle(
        tmp.path(),
        &[
            ("ledgerly.toml", signed("ledgerly")),
            ("rogue.toml", unsigned("reporter")),
            ("boom.toml", signed("panics_on_load")),
        ],
    );
    let mut registry = registry_with_scratch(tmp.path());

    let report = registry.import_artifact(&archive).unwrap();
    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(scratch_dirs(tmp.path()), Vec::<String>::new());
}

#[test]
fn scratch_is_removed_when_archive_is_corrupt() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_artifact(&incoming(tmp.path()), "bad.zip", "not a zip");
    let mut registry = registry_with_scratch(tmp.path());

    assert!(matches!(
        registry.import_artifact(&archive),
        Err(ExtensionHostError::Archive(_))
    ));
    assert_eq!(scratch_dirs(tmp.path()), Vec::<String>::new());
}

#[test]
fn scratch_names_do_not_reuse_existing_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let mut registry = registry_with_scratch(tmp.path());
    let foreign = tmp.path().join("scratch").join(format!("{SCRATCH_PREFIX}busy"));
    std::fs::create_dir_all(&foreign).unwrap();
    std::fs::write(foreign.join("ledgerly.toml"), signed("reporter")).unwrap();

    let archive = bundle(tmp.path(), &[("ledgerly.toml", signed("ledgerly"))]);
    registry.import_artifact(&archive).unwrap();
    registry.import_artifact(&archive).unwrap();

    assert_eq!(scratch_dirs(tmp.path()), vec![format!("{SCRATCH_PREFIX}busy")]);
    assert_eq!(file_names(&foreign), vec!["ledgerly.toml".to_string()]);
    assert!(registry.is_loaded(LEDGERLY_ID));
    assert!(!registry.is_loaded(REPORTER_ID));
}
