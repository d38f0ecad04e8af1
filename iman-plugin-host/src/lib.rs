//! Extension host for Iman Accounting.
//!
//! Discovers extension artifacts in a directory, admits only those carrying
//! the trust marker, instantiates the compiled-in extension each artifact
//! names, and aggregates the menu, toolbar, dashboard and report items of
//! the enabled ones.
//!
//! Every loaded extension talks to the application through its own
//! [`HostProxy`], which exposes ledger reads, transaction submission,
//! license facts, settings and notifications, and nothing else.

mod catalog;
mod config;
mod descriptor;
mod error;
mod install;
mod ledger;
mod manager;
mod proxy;
pub mod signature;

pub use catalog::ExtensionCatalog;
pub use config::{CONFIG_FILE_NAME, HostConfig};
pub use descriptor::{
    ARCHIVE_EXTENSION, ArtifactDescriptor, ArtifactKind, DESCRIPTOR_EXTENSION, RESERVED_PREFIX,
    is_candidate_name,
};
pub use error::ExtensionHostError;
pub use install::{ImportFailure, ImportReport, InstalledExtension, SCRATCH_PREFIX, backup_file_name};
pub use ledger::{AccountStore, LedgerError, MemoryLedger};
pub use manager::{
    BACKUP_DIR_NAME, CapabilityKind, Contribution, ContributionItem, ExtensionRecord,
    ExtensionRegistry, PACKAGE_MARKER,
};
pub use proxy::{HostContext, HostProxy, LogNotifier, Notifier, license_info};
pub use signature::{SIGNATURE_MARKER, SIGNATURE_WINDOW};
