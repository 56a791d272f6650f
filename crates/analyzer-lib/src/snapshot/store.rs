//! File-backed snapshot store
//!
//! Reads the collector's `metadata_snapshot_<timestamp>.json` files. A file
//! that cannot be read or parsed is skipped with a warning so that one bad
//! snapshot never aborts a processing cycle.

use super::SnapshotSource;
use crate::error::{AnalyzerError, Result};
use crate::models::{Record, Snapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name prefix written by the metadata collector
pub const SNAPSHOT_PREFIX: &str = "metadata_snapshot_";

/// File extension of snapshot files
pub const SNAPSHOT_EXTENSION: &str = "json";

/// File name for a snapshot taken at `timestamp`
pub fn snapshot_file_name(timestamp: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{timestamp}.{SNAPSHOT_EXTENSION}")
}

/// Extract the timestamp key from a snapshot file path
pub fn timestamp_from_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != SNAPSHOT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let timestamp = stem.strip_prefix(SNAPSHOT_PREFIX)?;
    (!timestamp.is_empty()).then(|| timestamp.to_string())
}

/// Snapshots loaded for one window, plus the files that were skipped
#[derive(Debug, Default)]
pub struct LoadedWindow {
    pub snapshots: Vec<Snapshot>,
    pub skipped: Vec<PathBuf>,
}

impl LoadedWindow {
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Snapshot store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All snapshot files in the directory, sorted oldest first
    pub fn snapshot_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(dir = %self.root.display(), "Snapshot directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(AnalyzerError::io(&self.root, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AnalyzerError::io(&self.root, e))?;
            let path = entry.path();
            if path.is_file() && timestamp_from_path(&path).is_some() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Read and parse one snapshot file
    pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
        let timestamp = timestamp_from_path(path).ok_or_else(|| {
            AnalyzerError::io(
                path,
                std::io::Error::new(ErrorKind::InvalidInput, "not a snapshot file name"),
            )
        })?;

        let content = fs::read_to_string(path).map_err(|e| AnalyzerError::io(path, e))?;
        let records: Vec<Record> =
            serde_json::from_str(&content).map_err(|source| AnalyzerError::MalformedSnapshot {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Snapshot::new(timestamp, records))
    }
}

impl SnapshotSource for FileSnapshotStore {
    fn load_window(&self, window_size: usize) -> Result<LoadedWindow> {
        let files = self.snapshot_files()?;
        let start = files.len().saturating_sub(window_size);

        let mut window = LoadedWindow::default();
        for path in &files[start..] {
            match Self::read_snapshot(path) {
                Ok(snapshot) => {
                    debug!(
                        path = %path.display(),
                        records = snapshot.records.len(),
                        "Loaded snapshot"
                    );
                    window.snapshots.push(snapshot);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable snapshot");
                    window.skipped.push(path.clone());
                }
            }
        }

        Ok(window)
    }
}
