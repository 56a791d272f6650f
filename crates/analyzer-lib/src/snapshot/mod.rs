//! Snapshot loading and normalization
//!
//! Snapshots are produced by the external metadata collector. This module
//! reads them from disk and reduces each one to the per-type counters the
//! feature builder works from.

mod normalize;
mod store;


pub use normalize::{
    normalize, normalize_window, status_key, SnapshotCounters, STATUS_SUFFIX,
};
pub use store::{
    snapshot_file_name, timestamp_from_path, FileSnapshotStore, LoadedWindow, SNAPSHOT_EXTENSION,
    SNAPSHOT_PREFIX,
};

use crate::error::Result;

/// Source of the most recent snapshots for a processing cycle
pub trait SnapshotSource: Send + Sync {
    /// Load up to `window_size` of the most recent snapshots, oldest first
    fn load_window(&self, window_size: usize) -> Result<LoadedWindow>;
}
