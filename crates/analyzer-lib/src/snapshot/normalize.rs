//! Snapshot normalization
//!
//! Reduces a raw snapshot to per-type counters and an identity → version
//! index. Snapshots sharing a timestamp collapse into one counter set.

use crate::models::{Record, ResourceIdentity, Snapshot};
use std::collections::BTreeMap;

/// Suffix of status counter keys
pub const STATUS_SUFFIX: &str = "_status";

/// Status counter key for a resource type
pub fn status_key(resource_type: &str) -> String {
    format!("{resource_type}{STATUS_SUFFIX}")
}

/// Normalized counters for one snapshot timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotCounters {
    pub timestamp: String,
    /// Number of records per resource type
    pub resource_count: BTreeMap<String, u64>,
    /// Owner-reference entries per resource type
    pub owner_ref_count: BTreeMap<String, u64>,
    /// Latest observed resource version per identity
    pub version_index: BTreeMap<ResourceIdentity, String>,
    /// Records carrying a non-empty status, keyed by `<type>_status`
    pub status_change_count: BTreeMap<String, u64>,
}

impl SnapshotCounters {
    pub fn empty(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            ..Default::default()
        }
    }

    fn absorb(&mut self, record: &Record) {
        let resource_type = record.resource_type.as_str();

        *self
            .resource_count
            .entry(resource_type.to_string())
            .or_insert(0) += 1;
        *self
            .owner_ref_count
            .entry(resource_type.to_string())
            .or_insert(0) += record.owner_references.len() as u64;

        self.version_index
            .insert(record.identity(), record.resource_version.clone());

        if record.has_status() {
            *self
                .status_change_count
                .entry(status_key(resource_type))
                .or_insert(0) += 1;
        }
    }

    pub fn total_resources(&self) -> u64 {
        self.resource_count.values().sum()
    }

    pub fn total_owner_refs(&self) -> u64 {
        self.owner_ref_count.values().sum()
    }

    pub fn total_statuses(&self) -> u64 {
        self.status_change_count.values().sum()
    }

    /// Count of a resource type, zero when the type was not observed
    pub fn count_of(&self, resource_type: &str) -> u64 {
        self.resource_count.get(resource_type).copied().unwrap_or(0)
    }
}

/// Normalize a single snapshot
pub fn normalize(snapshot: &Snapshot) -> SnapshotCounters {
    let mut counters = SnapshotCounters::empty(snapshot.timestamp.clone());
    for record in &snapshot.records {
        counters.absorb(record);
    }
    counters
}

/// Normalize a window of snapshots, one counter set per distinct timestamp,
/// sorted ascending by timestamp
pub fn normalize_window(snapshots: &[Snapshot]) -> Vec<SnapshotCounters> {
    let mut by_timestamp: BTreeMap<&str, SnapshotCounters> = BTreeMap::new();

    for snapshot in snapshots {
        let counters = by_timestamp
            .entry(snapshot.timestamp.as_str())
            .or_insert_with(|| SnapshotCounters::empty(snapshot.timestamp.clone()));
        for record in &snapshot.records {
            counters.absorb(record);
        }
    }

    by_timestamp.into_values().collect()
}
