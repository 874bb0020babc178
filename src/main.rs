use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;

mod backup;
mod config;
mod engine;
mod env;
mod error;
mod hashing;
mod pipeline;
mod registry;
mod resolver;
mod storage;
mod ui;
mod util;
mod version;

use crate::engine::UpdaterEngine;
use crate::engine::state::{CheckOptions, CheckOutcome};
use crate::error::Result;
use crate::storage::ConfigStore;

#[derive(Parser, Debug)]
#[command(
    name = "mod-updater",
    author,
    version,
    about = "Check a mods folder against the Modrinth registry and update outdated jars"
)]
struct Cli {
    /// Use this configuration file instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a profile's mods for updates (the default command).
    Check {
        /// Profile to check; defaults to the active profile.
        #[arg(short, long)]
        profile: Option<String>,
        /// Ignore the check interval.
        #[arg(short, long)]
        force: bool,
        /// Apply updates without asking when auto-update is off.
        #[arg(short, long)]
        yes: bool,
        /// Only print the summary.
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage mod folder profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    List,
    Add { name: String, path: String },
    Rename { old: String, new: String },
    SetPath { name: String, path: String },
    Remove {
        name: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Make a profile the active one.
    Use { name: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    /// Keys: loaders, game-versions, auto-update, backup, check-interval, api-url.
    Set { key: String, value: String },
    /// Delete the configuration file and start over with defaults.
    Reset {
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::new(cli.config);
    let first_run = !store.exists().await;
    let mut config = store.load().await;
    if first_run {
        store.save(&config).await?;
        println!("Created default configuration at {}", store.path().display());
    }

    let command = cli.command.unwrap_or(Command::Check {
        profile: None,
        force: false,
        yes: false,
        dry_run: false,
    });

    match command {
        Command::Check {
            profile,
            force,
            yes,
            dry_run,
        } => {
            let options = CheckOptions {
                force,
                assume_yes: yes,
                dry_run,
            };
            let mut engine = UpdaterEngine::new(config, store);
            let name = profile
                .clone()
                .unwrap_or_else(|| engine.config().current_folder.clone());
            ui::heading(&format!("Checking updates for profile '{name}'"));
            let outcome = engine
                .check_profile(profile.as_deref(), options, ui::confirm)
                .await?;
            report_outcome(&outcome);
        }
        Command::Profile { action } => {
            match action {
                ProfileAction::List => {
                    ui::print_profiles(&config);
                    return Ok(());
                }
                ProfileAction::Add { name, path } => config.add_profile(&name, &path)?,
                ProfileAction::Rename { old, new } => config.rename_profile(&old, &new)?,
                ProfileAction::SetPath { name, path } => config.set_profile_path(&name, &path)?,
                ProfileAction::Remove { name, yes } => {
                    let question = format!("Delete profile '{name}'? This cannot be undone.");
                    if !yes && !ui::confirm(&question, false) {
                        println!("Profile deletion canceled.");
                        return Ok(());
                    }
                    config.delete_profile(&name)?;
                }
                ProfileAction::Use { name } => config.use_profile(&name)?,
            }
            store.save(&config).await?;
            ui::print_profiles(&config);
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("Configuration file: {}", store.path().display());
                ui::print_config(&config);
            }
            ConfigAction::Set { key, value } => {
                config.set(&key, &value)?;
                store.save(&config).await?;
                ui::print_config(&config);
            }
            ConfigAction::Reset { yes } => {
                if !yes && !ui::confirm("Reset all settings? This cannot be undone.", false) {
                    println!("Reset canceled.");
                    return Ok(());
                }
                let fresh = store.reset().await?;
                println!("Configuration reset to defaults.");
                ui::print_config(&fresh);
            }
        },
    }
    Ok(())
}

fn report_outcome(outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::NotDue { days_since } => {
            println!("Skipped: last check was {days_since} days ago. Use --force to check anyway.");
        }
        CheckOutcome::NoModFiles => ui::error("No mod files found in the profile folder."),
        CheckOutcome::NothingHashed => ui::error("None of the mod files could be read."),
        CheckOutcome::UpToDate { summary } => {
            println!("Checked {} mods; nothing to update.", summary.len());
        }
        CheckOutcome::DryRun { summary } => {
            println!("Dry run: {} mods checked, no files were changed.", summary.len());
        }
        CheckOutcome::Declined => println!("No changes made."),
        CheckOutcome::Applied(report) => ui::print_report(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_check_command() {
        let cli = Cli::try_parse_from(["mod-updater"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_check_flags_and_global_config() {
        let cli = Cli::try_parse_from([
            "mod-updater",
            "check",
            "--profile",
            "server",
            "--force",
            "--dry-run",
            "--config",
            "/tmp/cfg.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cfg.json")));
        match cli.command {
            Some(Command::Check {
                profile,
                force,
                yes,
                dry_run,
            }) => {
                assert_eq!(profile.as_deref(), Some("server"));
                assert!(force && dry_run && !yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_profile_subcommands() {
        let cli =
            Cli::try_parse_from(["mod-updater", "profile", "set-path", "client", "~/mods"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Profile {
                action: ProfileAction::SetPath { .. }
            })
        ));
    }
}
