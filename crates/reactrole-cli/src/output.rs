//! Output formatting utilities

use colored::*;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Render rows in the specified format
pub fn render_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                Ok("No results".dimmed().to_string())
            } else {
                Ok(Table::new(rows).to_string())
            }
        }
        OutputFormat::Json => serde_json::to_string_pretty(rows),
    }
}

/// Print a vector of items in the specified format
pub fn print_output<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_rows(rows, format)?);
    Ok(())
}

/// Print a single item; both formats use pretty JSON
pub fn print_single<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}
