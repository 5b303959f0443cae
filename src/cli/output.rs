// Output formatting and display for CLI

use crate::config::PathProfile;
use crate::logs::MaintenanceReport;
use colored::*;
use std::fs;
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_count(verb: &str, count: usize, noun: &str) {
    if count == 0 {
        println!("{}", format!("Nothing to do: 0 {}", noun).yellow());
    } else {
        print_success_msg(&format!("{} {} {}", verb, count, noun));
    }
}

pub fn print_report(report: &MaintenanceReport) {
    println!("\n{}", "Maintenance".bold().underline());
    println!();
    println!("  {:<12} {}", "Archived:".bold(), report.archived);
    println!("  {:<12} {}", "Expired:".bold(), report.expired);
    println!(
        "  {:<12} {}",
        "Pruned:".bold(),
        if report.pruned { "yes".green() } else { "no".dimmed() }
    );
    println!();
}

/// Print a formatted table of the resolved layout
pub fn print_profile(profile: &PathProfile) {
    #[derive(Tabled)]
    struct PathRow {
        #[tabled(rename = "Role")]
        role: String,
        #[tabled(rename = "Path")]
        path: String,
        #[tabled(rename = "Size")]
        size: String,
    }

    let mut rows = vec![
        row("backups", &profile.backup_dir),
        row("archive", &profile.archive_dir),
        row("errors", &profile.error_file),
    ];
    rows.extend(profile.components.iter().map(|(name, path)| row(name, path)));

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    let mode = if profile.test_mode { "test" } else { "production" };
    println!(
        "{}",
        format!("Base: {} ({} mode)", profile.base_dir.display(), mode)
            .dimmed()
            .italic()
    );

    fn row(role: &str, path: &Path) -> PathRow {
        PathRow {
            role: role.to_string(),
            path: path.display().to_string(),
            size: describe(path),
        }
    }
}

/// Size of a file, entry count of a directory, or "-" when absent
fn describe(path: &Path) -> String {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path)
            .map(|entries| format!("{} file(s)", entries.count()))
            .unwrap_or_else(|_| "-".to_string()),
        Ok(meta) => format_size(meta.len()),
        Err(_) => "-".to_string(),
    }
}

/// Format a byte count in human-readable format
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}
