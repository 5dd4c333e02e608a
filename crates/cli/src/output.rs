//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Value the server uses for a slot with no matching sample
pub const SENTINEL: i64 = -1;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Render one series slot, showing gaps as `-`
pub fn format_slot(value: i64) -> String {
    if value == SENTINEL {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Render an app status slot
pub fn format_status(value: Option<i64>) -> String {
    match value {
        None => String::new(),
        Some(SENTINEL) => "-".dimmed().to_string(),
        Some(0) => "down".red().to_string(),
        Some(v) => v.to_string().green().to_string(),
    }
}

/// Color the alignment branch of a series
pub fn color_alignment(alignment: &str) -> String {
    match alignment {
        "exact" => alignment.green().to_string(),
        "synthesized" => alignment.yellow().to_string(),
        _ => alignment.to_string(),
    }
}
