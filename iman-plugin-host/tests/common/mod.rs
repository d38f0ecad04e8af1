//! Shared fixtures for extension host tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use iman_license::LicenseState;
use iman_plugin_host::{
    ArtifactDescriptor, ExtensionCatalog, ExtensionRegistry, HostContext, MemoryLedger, license_info,
};
use iman_plugin_sdk::prelude::*;
use iman_plugin_sdk::{NewTransaction, TransactionKind};
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MACHINE: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

// ── Test extensions ─────────────────────────────────────────────

/// Well-behaved extension contributing a menu item and a toolbar item.
#[derive(Default)]
pub struct Ledgerly {
    host: Option<Arc<dyn Host>>,
    enables: u32,
    disables: u32,
}

impl Extension for Ledgerly {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("ledgerly", "1.0.0")
            .with_capability("menu")
            .with_capability("toolbar")
    }

    fn on_load(&mut self, host: Arc<dyn Host>) -> Result<(), ExtensionError> {
        self.host = Some(host);
        Ok(())
    }

    fn on_enable(&mut self) -> Result<(), ExtensionError> {
        self.enables += 1;
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), ExtensionError> {
        self.disables += 1;
        Ok(())
    }

    fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
        Ok(vec![MenuItem {
            path: "Tools".into(),
            title: "Post sale".into(),
            command: "post".into(),
            shortcut: Some("Ctrl+L".into()),
        }])
    }

    fn toolbar_items(&self) -> Result<Vec<ToolbarItem>, ExtensionError> {
        Ok(vec![ToolbarItem {
            title: "Ledgerly".into(),
            command: "stats".into(),
            tooltip: None,
        }])
    }

    fn execute(&mut self, command: &str, args: &Value) -> CommandResult {
        match command {
            "stats" => CommandResult::success("stats")
                .with_data(json!({ "enables": self.enables, "disables": self.disables })),
            "post" => {
                let Some(host) = &self.host else {
                    return CommandResult::failure("not loaded");
                };
                let accounts = host.accounts();
                let id_of = |code: &str| accounts.iter().find(|a| a.code == code).map(|a| a.id);
                let (Some(cash), Some(sales)) = (id_of("1001"), id_of("4001")) else {
                    return CommandResult::failure("chart of accounts incomplete");
                };
                let posted = host.add_transaction(NewTransaction {
                    date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
                    description: "sale".into(),
                    kind: TransactionKind::Income,
                    amount: args["amount"].as_i64().unwrap_or(0),
                    debit_account_id: cash,
                    credit_account_id: sales,
                });
                if posted {
                    CommandResult::success("posted")
                } else {
                    CommandResult::failure("rejected")
                }
            }
            "license" => {
                let tier = self.host.as_ref().map(|h| h.license_info().tier).unwrap_or_default();
                CommandResult::success(tier)
            }
            "explode" => panic!("command exploded"),
            other => CommandResult::unknown_command(other),
        }
    }
}

/// Contributes one report.
#[derive(Default)]
pub struct Reporter;

impl Extension for Reporter {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("reporter", "2.1.0").with_capability("report")
    }

    fn reports(&self) -> Result<Vec<ReportItem>, ExtensionError> {
        Ok(vec![ReportItem {
            id: "monthly".into(),
            title: "Monthly summary".into(),
            command: "monthly".into(),
        }])
    }

    fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
        Ok(vec![MenuItem {
            path: "Reports".into(),
            title: "Monthly".into(),
            command: "monthly".into(),
            shortcut: None,
        }])
    }
}

/// Rejects being enabled.
#[derive(Default)]
pub struct FailsOnEnable;

impl Extension for FailsOnEnable {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("fails_on_enable", "1.0.0")
    }

    fn on_enable(&mut self) -> Result<(), ExtensionError> {
        Err(ExtensionError::Failed("database not ready".into()))
    }
}

/// Panics while loading.
#[derive(Default)]
pub struct PanicsOnLoad;

impl Extension for PanicsOnLoad {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("panics_on_load", "1.0.0")
    }

    fn on_load(&mut self, _host: Arc<dyn Host>) -> Result<(), ExtensionError> {
        panic!("load exploded");
    }
}

/// Loads fine but fails to produce its contributions.
#[derive(Default)]
pub struct BrokenItems;

impl Extension for BrokenItems {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("broken_items", "0.1.0")
    }

    fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
        Err(ExtensionError::Failed("menu unavailable".into()))
    }

    fn toolbar_items(&self) -> Result<Vec<ToolbarItem>, ExtensionError> {
        panic!("toolbar exploded");
    }

    fn reports(&self) -> Result<Vec<ReportItem>, ExtensionError> {
        Ok(vec![ReportItem {
            id: "ok".into(),
            title: "Still works".into(),
            command: "ok".into(),
        }])
    }
}

/// Stops being able to disable cleanly.
#[derive(Default)]
pub struct FailsOnDisable;

impl Extension for FailsOnDisable {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new("fails_on_disable", "1.0.0").with_capability("menu")
    }

    fn on_disable(&mut self) -> Result<(), ExtensionError> {
        Err(ExtensionError::Failed("busy".into()))
    }

    fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
        Ok(vec![MenuItem {
            path: "Tools".into(),
            title: "Stubborn".into(),
            command: "noop".into(),
            shortcut: None,
        }])
    }
}

mod ledgerly {
    iman_plugin_sdk::extension_entry!("ledgerly", super::Ledgerly);
}
mod reporter {
    iman_plugin_sdk::extension_entry!("reporter", super::Reporter);
}
mod fails_on_enable {
    iman_plugin_sdk::extension_entry!("fails_on_enable", super::FailsOnEnable);
}
mod panics_on_load {
    iman_plugin_sdk::extension_entry!("panics_on_load", super::PanicsOnLoad);
}
mod broken_items {
    iman_plugin_sdk::extension_entry!("broken_items", super::BrokenItems);
}
mod fails_on_disable {
    iman_plugin_sdk::extension_entry!("fails_on_disable", super::FailsOnDisable);
}

pub const LEDGERLY_ID: &str = "ledgerly_1.0.0";
pub const REPORTER_ID: &str = "reporter_2.1.0";

// ── Host fixtures ───────────────────────────────────────────────

pub fn catalog() -> ExtensionCatalog {
    [
        ledgerly::extension_entry(),
        reporter::extension_entry(),
        fails_on_enable::extension_entry(),
        panics_on_load::extension_entry(),
        broken_items::extension_entry(),
        fails_on_disable::extension_entry(),
    ]
    .into_iter()
    .collect()
}

pub fn context() -> (Arc<MemoryLedger>, HostContext) {
    let ledger = Arc::new(MemoryLedger::with_default_chart());
    let context = HostContext::new(ledger.clone(), license_info(&LicenseState::free(MACHINE)));
    (ledger, context)
}

/// Registry over `<root>/plugins`.
pub fn registry(root: &Path) -> ExtensionRegistry {
    let (_, context) = context();
    ExtensionRegistry::new(root.join("plugins"), catalog(), context).unwrap()
}

// ── Artifacts ───────────────────────────────────────────────────

pub fn signed(entry: &str) -> String {
    ArtifactDescriptor::for_entry(entry).to_toml().unwrap()
}

pub fn unsigned(entry: &str) -> String {
    format!("entry = \"{entry}\"\n")
}

pub fn write_artifact(dir: &Path, name: &str, contents: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Writes a zip archive holding `members` as (name, contents) pairs.
pub fn write_zip(path: &Path, members: &[(&str, String)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// File names directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
