//! Profit sharing: splits a profit or loss between partners by percentage.
//!
//! Commands:
//! - `calculate` with `{ "total_profit": i64, "partners": [{ "name", "percent" }] }`
//!   returns each partner's share in `data`.
//! - `report` with the same arguments, or none for the sample figures,
//!   returns a text report as the message.

mod split;

pub use split::{
    Partner, PartnerShare, ProfitSplit, SplitError, group_thousands, render_report, sample_split, split,
};

use chrono::Local;
use iman_plugin_sdk::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Registration name referenced by artifact descriptors.
pub const ENTRY_NAME: &str = "profit_sharing";

const TITLE: &str = "Profit sharing";

#[derive(Debug, Deserialize)]
struct SplitArgs {
    total_profit: i64,
    partners: Vec<Partner>,
}

#[derive(Default)]
pub struct ProfitSharing {
    host: Option<Arc<dyn Host>>,
}

impl ProfitSharing {
    fn calculate(&self, args: &Value) -> CommandResult {
        let args = match parse_args(args) {
            Ok(Some(args)) => args,
            Ok(None) => {
                let e = ExtensionError::InvalidArguments("total_profit and partners are required".into());
                return CommandResult::failure(e.to_string());
            }
            Err(e) => return CommandResult::failure(e.to_string()),
        };

        match split(args.total_profit, &args.partners) {
            Ok(result) => {
                let summary = format!(
                    "{} split between {} partners",
                    group_thousands(result.total_profit),
                    result.partners.len()
                );
                match serde_json::to_value(&result) {
                    Ok(data) => CommandResult::success(summary).with_data(data),
                    Err(e) => CommandResult::failure(e.to_string()),
                }
            }
            Err(e) => {
                self.warn(&e.to_string());
                CommandResult::failure(e.to_string())
            }
        }
    }

    fn report(&self, args: &Value) -> CommandResult {
        let result = match parse_args(args) {
            Ok(Some(args)) => match split(args.total_profit, &args.partners) {
                Ok(result) => result,
                Err(e) => {
                    self.warn(&e.to_string());
                    return CommandResult::failure(e.to_string());
                }
            },
            Ok(None) => sample_split(),
            Err(e) => return CommandResult::failure(e.to_string()),
        };

        let text = render_report(&result, Local::now().date_naive());
        match serde_json::to_value(&result) {
            Ok(data) => CommandResult::success(text).with_data(data),
            Err(e) => CommandResult::failure(e.to_string()),
        }
    }

    fn warn(&self, message: &str) {
        if let Some(host) = &self.host {
            host.show_message(MessageLevel::Warning, TITLE, message);
        }
    }
}

/// `None` when no arguments were given.
fn parse_args(args: &Value) -> Result<Option<SplitArgs>, ExtensionError> {
    match args {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        other => Ok(Some(serde_json::from_value(other.clone())?)),
    }
}

impl Extension for ProfitSharing {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest::new(ENTRY_NAME, "1.0.0")
            .with_author("Iman")
            .with_description("Splits profit and loss between partners")
            .with_capability("dashboard")
            .with_capability("menu")
            .with_capability("report")
    }

    fn on_load(&mut self, host: Arc<dyn Host>) -> Result<(), ExtensionError> {
        self.host = Some(host);
        debug!("Profit sharing extension loaded");
        Ok(())
    }

    fn on_enable(&mut self) -> Result<(), ExtensionError> {
        debug!("Profit sharing extension enabled");
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), ExtensionError> {
        debug!("Profit sharing extension disabled");
        Ok(())
    }

    fn menu_items(&self) -> Result<Vec<MenuItem>, ExtensionError> {
        Ok(vec![
            MenuItem {
                path: "Accounting/Profit sharing".into(),
                title: "Calculate profit sharing".into(),
                command: "calculate".into(),
                shortcut: Some("Ctrl+T".into()),
            },
            MenuItem {
                path: "Reports/Profit sharing".into(),
                title: "Profit sharing report".into(),
                command: "report".into(),
                shortcut: None,
            },
        ])
    }

    fn toolbar_items(&self) -> Result<Vec<ToolbarItem>, ExtensionError> {
        Ok(vec![ToolbarItem {
            title: TITLE.into(),
            command: "calculate".into(),
            tooltip: Some("Split profit and loss between partners".into()),
        }])
    }

    fn dashboard_widgets(&self) -> Result<Vec<DashboardWidget>, ExtensionError> {
        Ok(vec![DashboardWidget {
            id: ENTRY_NAME.into(),
            title: TITLE.into(),
            command: "calculate".into(),
            position: WidgetPosition::Top,
        }])
    }

    fn reports(&self) -> Result<Vec<ReportItem>, ExtensionError> {
        Ok(vec![ReportItem {
            id: ENTRY_NAME.into(),
            title: "Profit sharing report".into(),
            command: "report".into(),
        }])
    }

    fn execute(&mut self, command: &str, args: &Value) -> CommandResult {
        match command {
            "calculate" => self.calculate(args),
            "report" => self.report(args),
            other => CommandResult::unknown_command(other),
        }
    }
}

iman_plugin_sdk::extension_entry!(ENTRY_NAME, ProfitSharing);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn manifest_declares_capabilities() {
        let manifest = ProfitSharing::default().manifest();
        assert_eq!(manifest.id(), "profit_sharing_1.0.0");
        for capability in ["dashboard", "menu", "report"] {
            assert!(manifest.declares(capability));
        }
    }

    #[test]
    fn contributions() {
        let ext = ProfitSharing::default();
        let menu = ext.menu_items().unwrap();
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0].shortcut.as_deref(), Some("Ctrl+T"));
        assert_eq!(ext.toolbar_items().unwrap()[0].command, "calculate");
        assert_eq!(ext.dashboard_widgets().unwrap()[0].position, WidgetPosition::Top);
        assert_eq!(ext.reports().unwrap()[0].command, "report");
    }

    #[test]
    fn calculate_returns_shares() {
        let mut ext = ProfitSharing::default();
        let result = ext.execute(
            "calculate",
            &json!({
                "total_profit": 2_000,
                "partners": [{ "name": "A", "percent": 75 }, { "name": "B", "percent": 25 }]
            }),
        );
        assert!(result.success, "{}", result.message);
        let split: ProfitSplit = result.parse_data().unwrap();
        let shares: Vec<i64> = split.partners.iter().map(|p| p.share).collect();
        assert_eq!(shares, vec![1_500, 500]);
    }

    #[test]
    fn calculate_requires_arguments() {
        let mut ext = ProfitSharing::default();
        let result = ext.execute("calculate", &Value::Null);
        assert!(!result.success);
        assert!(result.message.starts_with("invalid arguments"));

        let malformed = ext.execute("calculate", &json!({ "total_profit": "lots" }));
        assert!(!malformed.success);
        assert!(malformed.message.starts_with("invalid arguments"));
    }

    #[test]
    fn calculate_rejects_bad_percent_total() {
        let mut ext = ProfitSharing::default();
        let result = ext.execute(
            "calculate",
            &json!({ "total_profit": 100, "partners": [{ "name": "A", "percent": 50 }] }),
        );
        assert!(!result.success);
        assert_eq!(result.message, "partner percents must add up to 100, got 50");
    }

    #[test]
    fn report_defaults_to_sample() {
        let mut ext = ProfitSharing::default();
        let result = ext.execute("report", &json!({}));
        assert!(result.success);
        assert!(result.message.contains("Total profit: 10,000,000 rials"));
        assert_eq!(result.parse_data::<ProfitSplit>(), Some(sample_split()));
    }

    #[test]
    fn unknown_command() {
        let mut ext = ProfitSharing::default();
        assert_eq!(ext.execute("print", &Value::Null).message, "unknown command: print");
    }

    #[test]
    fn entry_point_name() {
        let entry = extension_entry();
        assert_eq!(entry.name, ENTRY_NAME);
        assert_eq!(entry.instantiate().manifest().name, ENTRY_NAME);
    }
}
