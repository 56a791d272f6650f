//! Feature matrix construction
//!
//! Two passes over the window: the first collects the column universe from
//! every snapshot, the second materializes one row per snapshot against that
//! universe. The schema is window-global, so early rows carry zeros for
//! resource types that only appear later.
//!
//! The column universe grows with the number of distinct resource types and
//! status keys observed in the window.

use super::matrix::FeatureMatrix;
use crate::models::Snapshot;
use crate::snapshot::{normalize_window, SnapshotCounters};
use std::collections::{BTreeMap, BTreeSet};

/// Column holding the number of changed identities since the previous row
pub const VERSION_CHANGE_RATE: &str = "version_change_rate";

pub fn count_column(resource_type: &str) -> String {
    format!("count_{resource_type}")
}

pub fn owner_refs_column(resource_type: &str) -> String {
    format!("owner_refs_{resource_type}")
}

/// Build the feature matrix for a window of raw snapshots
pub fn extract_features(snapshots: &[Snapshot]) -> FeatureMatrix {
    build_matrix(&normalize_window(snapshots))
}

/// Build the feature matrix from normalized counters ordered by timestamp
pub fn build_matrix(window: &[SnapshotCounters]) -> FeatureMatrix {
    if window.is_empty() {
        return FeatureMatrix::default();
    }

    let mut matrix = FeatureMatrix::new(column_universe(window));

    for (i, counters) in window.iter().enumerate() {
        let mut values = BTreeMap::new();

        for (resource_type, count) in &counters.resource_count {
            values.insert(count_column(resource_type), *count as f64);
        }
        for (resource_type, refs) in &counters.owner_ref_count {
            values.insert(owner_refs_column(resource_type), *refs as f64);
        }

        let changes = match i {
            0 => 0,
            _ => version_changes(&window[i - 1], counters),
        };
        values.insert(VERSION_CHANGE_RATE.to_string(), changes as f64);

        for (status_key, count) in &counters.status_change_count {
            values.insert(status_key.clone(), *count as f64);
        }

        matrix.push_row(counters.timestamp.clone(), values);
    }

    matrix
}

/// Ordered column names for the whole window
fn column_universe(window: &[SnapshotCounters]) -> Vec<String> {
    let resource_types: BTreeSet<&str> = window
        .iter()
        .flat_map(|c| c.resource_count.keys().map(String::as_str))
        .collect();
    let status_keys: BTreeSet<&str> = window
        .iter()
        .flat_map(|c| c.status_change_count.keys().map(String::as_str))
        .collect();

    let mut columns: Vec<String> = resource_types.iter().map(|t| count_column(t)).collect();
    columns.extend(resource_types.iter().map(|t| owner_refs_column(t)));
    columns.push(VERSION_CHANGE_RATE.to_string());
    columns.extend(status_keys.iter().map(|k| k.to_string()));
    columns
}

/// Number of identities whose version differs between two snapshots
///
/// An identity present on only one side counts as changed.
pub fn version_changes(previous: &SnapshotCounters, current: &SnapshotCounters) -> u64 {
    let identities: BTreeSet<_> = previous
        .version_index
        .keys()
        .chain(current.version_index.keys())
        .collect();

    identities
        .into_iter()
        .filter(|id| previous.version_index.get(*id) != current.version_index.get(*id))
        .count() as u64
}
