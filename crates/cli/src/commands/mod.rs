//! CLI subcommands

pub mod anomalies;
pub mod features;
pub mod inventory;

use analyzer_lib::snapshot::{FileSnapshotStore, LoadedWindow, SnapshotSource};
use anyhow::{Context, Result};
use std::path::Path;

use crate::output::{print_warning, OutputFormat};

/// Load the most recent snapshots, reporting skipped files on stderr
pub fn load_window(input: &Path, window: usize, format: OutputFormat) -> Result<LoadedWindow> {
    let store = FileSnapshotStore::new(input);
    let loaded = store
        .load_window(window.max(1))
        .with_context(|| format!("failed to load snapshots from {}", input.display()))?;

    if matches!(format, OutputFormat::Table) {
        for path in &loaded.skipped {
            print_warning(&format!("Skipped unreadable snapshot {}", path.display()));
        }
    }

    Ok(loaded)
}
