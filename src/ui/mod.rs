use std::io::{self, BufRead, IsTerminal, Write};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;
use tabled::Tabled;
use tabled::settings::style::Style;

use crate::config::Config;
use crate::pipeline::UpdateReport;
use crate::resolver::{ModStatus, ModSummary};
use crate::util::file_name;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "MOD")]
    name: String,
    #[tabled(rename = "CURRENT")]
    current: String,
    #[tabled(rename = "LATEST")]
    latest: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    active: &'static str,
    #[tabled(rename = "PROFILE")]
    name: String,
    #[tabled(rename = "FOLDER")]
    folder: String,
}

fn rule() {
    println!("{}", "─".repeat(60).dimmed());
}

pub fn heading(text: &str) {
    rule();
    println!("{}", text.cyan().bold());
    rule();
}

/// User-facing warning; the run continues.
pub fn warning(text: &str) {
    eprintln!("{} {text}", "[!]".yellow());
}

pub fn error(text: &str) {
    eprintln!("{} {text}", "[ERROR]".red());
}

fn status_marker(status: ModStatus) -> &'static str {
    match status {
        ModStatus::UpdateAvailable => "⬆",
        ModStatus::UpToDate => "✓",
        ModStatus::NotFound | ModStatus::NoUpdateInfo | ModStatus::Unknown => "?",
    }
}

pub fn print_summary(rows: &[ModSummary]) {
    let table_rows: Vec<SummaryRow> = rows
        .iter()
        .map(|row| SummaryRow {
            name: row.name.clone(),
            current: row.current_version.clone().unwrap_or_else(|| "Unknown".into()),
            latest: row.latest_version.clone().unwrap_or_else(|| "Unknown".into()),
            status: format!("{} {}", status_marker(row.status), row.status.label()),
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    let pending = rows
        .iter()
        .filter(|row| row.status == ModStatus::UpdateAvailable)
        .count();
    if pending == 0 {
        println!("{} All mods are up to date.", "✓".green().bold());
    } else {
        println!(
            "{} {} update(s) available.",
            "⬆".yellow().bold(),
            pending.to_string().yellow().bold()
        );
    }
}

pub fn print_report(report: &UpdateReport) {
    println!();
    heading("Update results");
    if let Some(backup) = &report.backup {
        println!("{} Backup created at {}", "[*]".blue(), backup.display());
    }
    if report.aborted {
        error("Backup failed; no mods were changed.");
    }

    println!(
        "{} mods processed: {} updated, {} failed, {} skipped",
        report.total(),
        report.updated.len().to_string().green().bold(),
        report.failed.len().to_string().red().bold(),
        report.skipped.len().to_string().dimmed()
    );
    for renamed in &report.updated {
        println!("  {} {renamed}", "✓".green());
    }
    for path in &report.failed {
        println!("  {} {}", "✗".red(), file_name(path));
    }
    for path in &report.skipped {
        println!("  {} {}", "-".dimmed(), file_name(path).dimmed());
    }
}

pub fn print_profiles(config: &Config) {
    let rows: Vec<ProfileRow> = config
        .mod_folders
        .iter()
        .map(|profile| ProfileRow {
            active: if profile.name == config.current_folder {
                "*"
            } else {
                ""
            },
            name: profile.name.clone(),
            folder: profile.folder.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{table}");
}

pub fn print_config(config: &Config) {
    print_profiles(config);
    println!("{:<16} {}", "active profile".cyan(), config.current_folder);
    println!("{:<16} {}", "loaders".cyan(), config.loaders.join(", "));
    println!("{:<16} {}", "game versions".cyan(), config.game_versions.join(", "));
    println!("{:<16} {}", "auto-update".cyan(), yes_no(config.auto_update));
    println!("{:<16} {}", "backup".cyan(), yes_no(config.backup_mods));
    println!(
        "{:<16} {} days",
        "check interval".cyan(),
        config.check_interval_days
    );
    println!(
        "{:<16} {}",
        "last check".cyan(),
        config.last_check.as_deref().unwrap_or("never")
    );
    println!("{:<16} {}", "api url".cyan(), config.api_url);
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Ask a yes/no question on stdin. Empty input or a closed stdin picks `default`.
pub fn confirm(question: &str, default: bool) -> bool {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {hint} ", question.bold());
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return default;
    }
    parse_answer(&answer).unwrap_or(default)
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Progress bar for a batch of `len` files; hidden when stdout is not a terminal.
pub fn progress_bar(len: usize, prefix: &'static str) -> ProgressBar {
    if !io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {elapsed} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(prefix);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yes_no_answers() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" YES "), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn markers_follow_status() {
        assert_eq!(status_marker(ModStatus::UpdateAvailable), "⬆");
        assert_eq!(status_marker(ModStatus::UpToDate), "✓");
        assert_eq!(status_marker(ModStatus::NotFound), "?");
    }
}
