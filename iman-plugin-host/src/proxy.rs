//! The host handle given to each loaded extension.
//!
//! A [`HostProxy`] exposes ledger reads, transaction submission, license facts,
//! settings and user notifications. It never hands out the underlying store.

use iman_license::LicenseState;
use iman_plugin_sdk::{Account, Host, LicenseInfo, MessageLevel, NewTransaction, Transaction};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

use crate::ledger::AccountStore;

/// Delivers host messages raised by extensions to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, source: &str, level: MessageLevel, title: &str, message: &str);
}

/// Emits host messages as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, source: &str, level: MessageLevel, title: &str, message: &str) {
        match level {
            MessageLevel::Info => info!(extension_id = %source, title, "{message}"),
            MessageLevel::Warning => warn!(extension_id = %source, title, "{message}"),
            MessageLevel::Error => error!(extension_id = %source, title, "{message}"),
        }
    }
}

/// Builds the extension-facing view of a license state.
pub fn license_info(state: &LicenseState) -> LicenseInfo {
    LicenseInfo {
        tier: state.tier.wire_name().to_string(),
        is_admin: state.is_admin,
        is_site: state.is_site,
        hardware_id: state.hardware_id.clone(),
    }
}

/// Host state shared by every proxy.
#[derive(Clone)]
pub struct HostContext {
    ledger: Arc<dyn AccountStore>,
    settings: Arc<BTreeMap<String, String>>,
    license: Arc<RwLock<LicenseInfo>>,
    notifier: Arc<dyn Notifier>,
}

impl HostContext {
    pub fn new(ledger: Arc<dyn AccountStore>, license: LicenseInfo) -> Self {
        Self {
            ledger,
            settings: Arc::new(BTreeMap::new()),
            license: Arc::new(RwLock::new(license)),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_settings(mut self, settings: BTreeMap<String, String>) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Publishes a new license state to every proxy built from this context.
    pub fn set_license(&self, info: LicenseInfo) {
        let mut guard = self.license.write().unwrap_or_else(|p| p.into_inner());
        *guard = info;
    }

    pub fn license(&self) -> LicenseInfo {
        self.license.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("settings", &self.settings)
            .field("license", &self.license())
            .finish_non_exhaustive()
    }
}

/// Capability-scoped host handle for one extension.
#[derive(Debug, Clone)]
pub struct HostProxy {
    extension_id: String,
    context: HostContext,
}

impl HostProxy {
    pub fn new(extension_id: impl Into<String>, context: HostContext) -> Self {
        Self {
            extension_id: extension_id.into(),
            context,
        }
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }
}

impl Host for HostProxy {
    fn accounts(&self) -> Vec<Account> {
        self.context.ledger.list_accounts()
    }

    fn transactions(&self, limit: usize) -> Vec<Transaction> {
        let mut all = self.context.ledger.list_transactions();
        all.truncate(limit);
        all
    }

    fn add_transaction(&self, transaction: NewTransaction) -> bool {
        match self.context.ledger.add_transaction(transaction) {
            Ok(_) => true,
            Err(e) => {
                warn!(extension_id = %self.extension_id, error = %e, "Transaction rejected");
                false
            }
        }
    }

    fn license_info(&self) -> LicenseInfo {
        self.context.license()
    }

    fn setting(&self, key: &str) -> Option<String> {
        self.context.settings.get(key).cloned()
    }

    fn show_message(&self, level: MessageLevel, title: &str, message: &str) {
        self.context.notifier.notify(&self.extension_id, level, title, message);
    }
}
