//! Extensions shipped with Iman Accounting.
//!
//! Each module exposes an `extension_entry()` registration function. An
//! artifact in the extension directory selects one of them by name:
//!
//! ```toml
//! PLUGIN_SIGNATURE = "IMAN_ACCOUNTING_PLUGIN_2024"
//! entry = "profit_sharing"
//! ```

use iman_plugin_host::ExtensionCatalog;

pub mod profit_sharing;

/// Catalog of every built-in entry point.
pub fn builtin_catalog() -> ExtensionCatalog {
    [profit_sharing::extension_entry()].into_iter().collect()
}
