//! Delimited-text table sink with retention
//!
//! Writes `features_<cycle>.csv` and `anomalies_<cycle>.csv` into the output
//! directory and keeps only the newest files of each kind.

use super::TableSink;
use crate::error::{AnalyzerError, Result};
use crate::models::Table;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Files of each kind kept by default (two days at 30-minute cycles)
pub const DEFAULT_RETENTION: usize = 48;

const FEATURES_PREFIX: &str = "features_";
const ANOMALIES_PREFIX: &str = "anomalies_";
const EXTENSION: &str = "csv";

/// Cycle identifier used in output file names
pub fn cycle_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Table sink writing CSV files into a directory
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    output_dir: PathBuf,
    retention: usize,
}

impl CsvTableSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the file a table of `prefix` kind is written to
    pub fn file_path(&self, prefix: &str, cycle_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{prefix}{cycle_id}.{EXTENSION}"))
    }

    fn write(&self, prefix: &str, cycle_id: &str, table: &Table) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| AnalyzerError::io(&self.output_dir, e))?;

        let path = self.file_path(prefix, cycle_id);
        let file = File::create(&path).map_err(|e| AnalyzerError::io(&path, e))?;
        let mut writer = BufWriter::new(file);

        write_record(&mut writer, &table.header).map_err(|e| AnalyzerError::io(&path, e))?;
        for row in &table.rows {
            write_record(&mut writer, row).map_err(|e| AnalyzerError::io(&path, e))?;
        }
        writer.flush().map_err(|e| AnalyzerError::io(&path, e))?;

        info!(path = %path.display(), rows = table.rows.len(), "Saved table");
        Ok(path)
    }

    /// Delete the oldest files of a kind beyond the retention count
    pub fn enforce_retention(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.output_dir).map_err(|e| AnalyzerError::io(&self.output_dir, e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_table_file(path, prefix))
            .collect();
        files.sort();

        let excess = files.len().saturating_sub(self.retention);
        let removed: Vec<PathBuf> = files.drain(..excess).collect();
        for path in &removed {
            fs::remove_file(path).map_err(|e| AnalyzerError::io(path, e))?;
            info!(path = %path.display(), "Removed old table file");
        }

        Ok(removed)
    }
}

impl TableSink for CsvTableSink {
    fn store_features(&self, cycle_id: &str, table: &Table) -> Result<()> {
        self.write(FEATURES_PREFIX, cycle_id, table)?;
        self.enforce_retention(FEATURES_PREFIX)?;
        Ok(())
    }

    fn store_anomalies(&self, cycle_id: &str, table: &Table) -> Result<()> {
        self.write(ANOMALIES_PREFIX, cycle_id, table)?;
        self.enforce_retention(ANOMALIES_PREFIX)?;
        Ok(())
    }
}

fn is_table_file(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(prefix) && path.extension().and_then(|e| e.to_str()) == Some(EXTENSION)
}

fn write_record<W: Write>(writer: &mut W, cells: &[String]) -> std::io::Result<()> {
    let line = cells
        .iter()
        .map(|cell| escape_cell(cell))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{line}")
}

/// Quote a cell containing the delimiter, quotes or line breaks
fn escape_cell(cell: &str) -> String {
    if cell.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
