//! Resource inventory per snapshot

use analyzer_lib::models::Snapshot;
use analyzer_lib::snapshot::normalize_window;
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_table, print_warning, OutputFormat};

/// Row for the inventory table
#[derive(Debug, Tabled, Serialize)]
pub struct InventoryRow {
    #[tabled(rename = "Timestamp")]
    pub timestamp: String,
    #[tabled(rename = "Resources")]
    pub resources: u64,
    #[tabled(rename = "Types")]
    pub types: usize,
    #[tabled(rename = "Owner Refs")]
    pub owner_refs: u64,
    #[tabled(rename = "With Status")]
    pub statuses: u64,
}

/// Summarize each snapshot timestamp in the window
pub fn inventory_rows(snapshots: &[Snapshot]) -> Vec<InventoryRow> {
    normalize_window(snapshots)
        .into_iter()
        .map(|c| InventoryRow {
            resources: c.total_resources(),
            types: c.resource_count.len(),
            owner_refs: c.total_owner_refs(),
            statuses: c.total_statuses(),
            timestamp: c.timestamp,
        })
        .collect()
}

pub fn show_inventory(snapshots: &[Snapshot], format: OutputFormat) -> Result<()> {
    let rows = inventory_rows(snapshots);
    if rows.is_empty() && matches!(format, OutputFormat::Table) {
        print_warning("No snapshots found");
        return Ok(());
    }

    print_table(&rows, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_lib::models::{OwnerReference, Record};

    #[test]
    fn test_inventory_totals() {
        let pod = Record::new("pods", Some("default"), "web-1", "7")
            .with_owner(OwnerReference::new("ReplicaSet", "web", "uid-1"));
        let node = Record::new("nodes", None, "node-a", "3");
        let rows = inventory_rows(&[
            Snapshot::new("20240101_000000", vec![pod, node]),
            Snapshot::new("20240101_000500", Vec::new()),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resources, 2);
        assert_eq!(rows[0].types, 2);
        assert_eq!(rows[0].owner_refs, 1);
        assert_eq!(rows[1].resources, 0);
    }
}
