//! Output formatting utilities

use analyzer_lib::models::Table as DataTable;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

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
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a table whose columns are only known at runtime
pub fn print_rows(data: &DataTable) {
    println!("{}", render_rows(data));
}

fn render_rows(data: &DataTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(data.header.iter().cloned());
    for row in &data.rows {
        builder.push_record(row.iter().cloned());
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an anomaly score
pub fn format_score(score: f64) -> String {
    format!("{:.4}", score)
}

/// Color a score relative to the flagging threshold
pub fn color_score(score: f64, threshold: f64) -> String {
    let formatted = format_score(score);
    if score > threshold {
        formatted.red().bold().to_string()
    } else if score > 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.123456), "0.1235");
        assert_eq!(format_score(1.0), "1.0000");
    }

    #[test]
    fn test_render_rows_keeps_dynamic_columns() {
        let data = DataTable {
            header: vec!["timestamp".into(), "count_pods".into()],
            rows: vec![vec!["20240101_000000".into(), "5".into()]],
        };

        let rendered = render_rows(&data);
        assert!(rendered.contains("count_pods"));
        assert!(rendered.contains("20240101_000000"));
    }
}
