//! Iman Accounting command-line tool.
//!
//! Usage:
//!   iman fingerprint
//!   iman status
//!   iman activate <TOKEN> | --file license.lic
//!   iman issue --hwid <ID> --tier PRO [--days 365] [--out DIR]
//!   iman extensions list | import <PATH> | items [--kind menu] | run <ID> <COMMAND> [--args JSON]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use iman_cli::{App, IssueRequest, resolve_config_path, status_lines};
use iman_license::{LicenseTier, write_issued};
use iman_plugin_host::{CapabilityKind, HostConfig};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "iman", version)]
#[command(about = "Iman Accounting license and extension tool")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "IMAN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print this machine's hardware ID
    Fingerprint,

    /// Show the active license
    Status,

    /// Validate a license token and store it
    Activate {
        /// The token text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        token: Option<String>,

        /// Read the token from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Issue a license for a machine (administrator license required)
    Issue {
        /// Hardware ID of the target machine
        #[arg(long)]
        hwid: String,

        /// FREE, TRIAL, PRO, ADMIN or SITE
        #[arg(long, value_parser = parse_tier)]
        tier: LicenseTier,

        /// Validity in days for trial and professional licenses
        #[arg(long)]
        days: Option<i64>,

        /// Institution name for site licenses
        #[arg(long)]
        site_name: Option<String>,

        /// Also write the token to license_<hwid>.lic in this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage extensions
    #[command(subcommand)]
    Extensions(ExtensionsCommand),
}

#[derive(Subcommand, Debug)]
enum ExtensionsCommand {
    /// List loaded extensions
    List,

    /// Install a descriptor (.toml) or an archive of descriptors (.zip)
    Import { path: PathBuf },

    /// Show aggregated menu, toolbar, dashboard and report items
    Items {
        /// Only this kind: menu, toolbar, dashboard or report
        #[arg(long)]
        kind: Option<CapabilityKind>,
    },

    /// Run an extension command
    Run {
        id: String,
        command: String,

        /// Command arguments as JSON
        #[arg(long, default_value = "null")]
        args: String,
    },
}

fn parse_tier(s: &str) -> Result<LicenseTier, String> {
    s.parse()
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config_path = resolve_config_path(args.config.as_deref());
    debug!("Using config path {:?}", config_path);
    let config = HostConfig::load_from(&config_path);

    let mut app = App::start(config)?;

    match args.command {
        Command::Fingerprint => println!("{}", app.fingerprint()),

        Command::Status => {
            for line in status_lines(app.license()) {
                println!("{line}");
            }
        }

        Command::Activate { token, file } => {
            let token = match (token, file) {
                (Some(token), _) => token,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read token file {}", path.display()))?,
                (None, None) => bail!("Provide a token or --file"),
            };
            let state = app.activate(&token)?;
            println!("{} license activated", state.tier.label());
        }

        Command::Issue {
            hwid,
            tier,
            days,
            site_name,
            out,
        } => {
            let request = IssueRequest {
                hardware_id: hwid,
                tier,
                days,
                site_name,
            };
            let token = app.issue(&request)?;
            println!("{token}");
            if let Some(dir) = out {
                let path = write_issued(&dir, &request.hardware_id, &token)
                    .with_context(|| format!("Failed to write license file to {}", dir.display()))?;
                eprintln!("Saved to {}", path.display());
            }
        }

        Command::Extensions(command) => run_extensions(&mut app, command)?,
    }

    Ok(())
}

fn run_extensions(app: &mut App, command: ExtensionsCommand) -> Result<()> {
    match command {
        ExtensionsCommand::List => {
            if app.registry().is_empty() {
                println!("No extensions loaded from {}", app.registry().extension_dir().display());
            }
            for record in app.registry().list() {
                let state = if record.enabled { "enabled" } else { "disabled" };
                println!(
                    "{:<32} {:<8} {}  ({})",
                    record.id,
                    state,
                    record.manifest.description,
                    record.source_path.display()
                );
            }
        }

        ExtensionsCommand::Import { path } => {
            let report = app.import(&path)?;
            for installed in &report.imported {
                match &installed.backup {
                    Some(backup) => println!(
                        "Installed {} as {} (previous version saved to {})",
                        installed.file_name,
                        installed.extension_id,
                        backup.display()
                    ),
                    None => println!("Installed {} as {}", installed.file_name, installed.extension_id),
                }
            }
            for failure in &report.failures {
                println!("Rejected {}: {}", failure.file_name, failure.error);
            }
            if report.imported.is_empty() {
                bail!("Nothing was imported from {}", path.display());
            }
        }

        ExtensionsCommand::Items { kind } => {
            for (kind, contribution) in app.items(kind) {
                println!(
                    "{:<10} {:<32} {:<32} -> {}",
                    kind,
                    contribution.extension_id,
                    contribution.item.title(),
                    contribution.item.command()
                );
            }
        }

        ExtensionsCommand::Run { id, command, args } => {
            let args: serde_json::Value = serde_json::from_str(&args).context("--args must be valid JSON")?;
            let result = app.run(&id, &command, &args)?;
            if !result.success {
                bail!("{}", result.message);
            }
            println!("{}", result.message);
            if let Some(data) = &result.data {
                println!("{}", serde_json::to_string_pretty(data)?);
            }
        }
    }
    Ok(())
}
