//! SDK for building Iman Accounting extensions.
//!
//! Extension authors implement the [`Extension`] trait and expose a
//! registration entry point with [`extension_entry!`]. The host hands each
//! loaded extension an [`Arc<dyn Host>`](Host), the only channel through which
//! it can read or change application state.
//!
//! # Example
//!
//! ```
//! use iman_plugin_sdk::prelude::*;
//!
//! #[derive(Default)]
//! struct Hello {
//!     host: Option<Arc<dyn Host>>,
//! }
//!
//! impl Extension for Hello {
//!     fn manifest(&self) -> ExtensionManifest {
//!         ExtensionManifest::new("hello", "1.0.0").with_capability("menu")
//!     }
//!
//!     fn on_load(&mut self, host: Arc<dyn Host>) -> Result<(), ExtensionError> {
//!         self.host = Some(host);
//!         Ok(())
//!     }
//!
//!     fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
//!         Ok(vec![MenuItem {
//!             path: "Tools".into(),
//!             title: "Say hello".into(),
//!             command: "hello".into(),
//!             shortcut: None,
//!         }])
//!     }
//! }
//!
//! iman_plugin_sdk::extension_entry!("hello", Hello);
//!
//! let entry = extension_entry();
//! assert_eq!(entry.name, "hello");
//! assert_eq!((entry.factory)().manifest().id(), "hello_1.0.0");
//! ```

mod error;
pub mod prelude;
pub mod types;

use std::sync::Arc;

pub use error::ExtensionError;
pub use types::*;

// ---- Extension Trait ----

/// Contract every extension implements.
///
/// Hooks return `Err` to signal failure. Contribution lists default to empty,
/// and `execute` defaults to rejecting every command.
pub trait Extension: Send {
    fn manifest(&self) -> ExtensionManifest;

    /// Called once after instantiation with the extension's host handle.
    fn on_load(&mut self, _host: Arc<dyn Host>) -> Result<(), ExtensionError> {
        Ok(())
    }
    fn on_enable(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }
    fn on_disable(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }

    fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
        Ok(Vec::new())
    }
    fn toolbar_items(&self) -> Result<Vec<ToolbarItem>, ExtensionError> {
        Ok(Vec::new())
    }
    fn dashboard_widgets(&self) -> Result<Vec<DashboardWidget>, ExtensionError> {
        Ok(Vec::new())
    }
    fn reports(&self) -> Result<Vec<ReportItem>, ExtensionError> {
        Ok(Vec::new())
    }

    /// Runs a command named by one of this extension's contributions.
    fn execute(&mut self, command: &str, _args: &serde_json::Value) -> CommandResult {
        CommandResult::unknown_command(command)
    }
}

// ---- Host Trait ----

/// Host operations available to an extension.
pub trait Host: Send + Sync {
    fn accounts(&self) -> Vec<Account>;

    /// Most recent transactions first, at most `limit`.
    fn transactions(&self, limit: usize) -> Vec<Transaction>;

    /// Submits a transaction to the host's ledger. Returns false if rejected.
    fn add_transaction(&self, transaction: NewTransaction) -> bool;

    fn license_info(&self) -> LicenseInfo;

    fn setting(&self, key: &str) -> Option<String>;

    fn show_message(&self, level: MessageLevel, title: &str, message: &str);
}

// ---- Registration ----

/// Constructs a fresh extension instance.
pub type ExtensionFactory = fn() -> Box<dyn Extension>;

/// Registration entry point exposed by an extension module.
#[derive(Clone, Copy)]
pub struct ExtensionEntry {
    /// Name artifacts use to refer to this entry point.
    pub name: &'static str,
    pub factory: ExtensionFactory,
}

impl ExtensionEntry {
    pub const fn new(name: &'static str, factory: ExtensionFactory) -> Self {
        Self { name, factory }
    }

    pub fn instantiate(&self) -> Box<dyn Extension> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ExtensionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Generate the `extension_entry()` registration function for an extension type.
///
/// # Usage
///
/// ```ignore
/// iman_plugin_sdk::extension_entry!("profit_sharing", ProfitSharing);
/// ```
///
/// The extension type must implement `Default` and `Extension`.
#[macro_export]
macro_rules! extension_entry {
    ($name:expr, $ext_ty:ty) => {
        /// Registration entry point for this extension module.
        pub fn extension_entry() -> $crate::ExtensionEntry {
            fn __create() -> ::std::boxed::Box<dyn $crate::Extension> {
                ::std::boxed::Box::new(<$ext_ty as ::std::default::Default>::default())
            }
            $crate::ExtensionEntry::new($name, __create)
        }
    };
}
