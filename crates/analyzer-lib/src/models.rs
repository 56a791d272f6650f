//! Core data models for the metadata analyzer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace used in identities of cluster-scoped resources
pub const CLUSTER_SCOPE: &str = "cluster";

/// One point-in-time capture of cluster resource metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sortable timestamp key (e.g. `20240101_120000`)
    pub timestamp: String,
    pub records: Vec<Record>,
}

impl Snapshot {
    pub fn new(timestamp: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            timestamp: timestamp.into(),
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Metadata of a single observed cluster object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub resource_type: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default = "default_resource_version")]
    pub resource_version: String,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default)]
    pub status: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

fn default_resource_version() -> String {
    "0".to_string()
}

impl Record {
    /// Create a record with no owners, status or labels
    pub fn new(
        resource_type: impl Into<String>,
        namespace: Option<&str>,
        name: impl Into<String>,
        resource_version: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            namespace: namespace.map(str::to_string),
            name: name.into(),
            resource_version: resource_version.into(),
            owner_references: Vec::new(),
            status: None,
            uid: None,
            creation_timestamp: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner_references.push(owner);
        self
    }

    pub fn with_status(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.status
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::of(self)
    }

    /// True if the record carries at least one status entry
    pub fn has_status(&self) -> bool {
        self.status.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Reference from a resource to its owning controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
}

impl OwnerReference {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// Key correlating the same object across snapshots
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    pub fn of(record: &Record) -> Self {
        let namespace = record.namespace.as_deref().unwrap_or(CLUSTER_SCOPE);
        Self(format!(
            "{}_{}_{}",
            record.resource_type, namespace, record.name
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Neutral tabular shape handed to persistence sinks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parses_collector_output() {
        let json = r#"{
            "resource_type": "pods",
            "name": "web-1",
            "namespace": "default",
            "creation_timestamp": "2024-01-01T00:00:00+00:00",
            "resource_version": "1234",
            "uid": "abc",
            "labels": {"app": "web"},
            "annotations": {},
            "owner_references": [{"kind": "ReplicaSet", "name": "web-7d9", "uid": "rs-1"}],
            "status": {"phase": "Running"}
        }"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.resource_type, "pods");
        assert_eq!(record.owner_references.len(), 1);
        assert!(record.has_status());
        assert_eq!(record.labels.get("app").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_record_defaults() {
        let json = r#"{"resource_type": "namespaces", "name": "kube-system", "namespace": null}"#;
        let record: Record = serde_json::from_str(json).unwrap();

        assert_eq!(record.resource_version, "0");
        assert!(record.owner_references.is_empty());
        assert!(!record.has_status());
        assert_eq!(record.identity().as_str(), "namespaces_cluster_kube-system");
    }

    #[test]
    fn test_empty_status_is_not_status() {
        let mut record = Record::new("pods", Some("default"), "a", "1");
        record.status = Some(BTreeMap::new());
        assert!(!record.has_status());
    }

    #[test]
    fn test_identity_distinguishes_namespaces() {
        let a = Record::new("pods", Some("default"), "web", "1");
        let b = Record::new("pods", Some("prod"), "web", "1");
        assert_ne!(a.identity(), b.identity());
    }
}
