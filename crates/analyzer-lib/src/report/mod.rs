//! Reporting of cycle results
//!
//! The engine only knows two abstract sinks: one for numeric gauges and one
//! for feature/anomaly tables. Delivery failures surface to the caller of
//! the cycle; nothing here retries.

mod adapter;
mod csv_sink;

#[cfg(test)]
mod tests;

pub use adapter::{ReportOutcome, ReportingAdapter, OVERALL_LABEL};
pub use csv_sink::{cycle_id, CsvTableSink, DEFAULT_RETENTION};

use crate::error::Result;
use crate::models::Table;

/// Gauges published by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gauge {
    /// Non-timestamp columns in the final feature matrix
    ProcessedFeaturesCount,
    /// Mean anomaly score, labelled by resource type
    AnomalyScore,
    /// Categorical association, labelled by field pair
    CorrelationScore,
    /// Resources in the latest snapshot, labelled by resource type
    MetadataCount,
    /// Owner references in the latest snapshot, labelled by resource type
    OwnerReferenceCount,
    /// Absolute count change against the previous snapshot
    MetadataChangeRate,
}

impl Gauge {
    pub fn name(&self) -> &'static str {
        match self {
            Gauge::ProcessedFeaturesCount => "k8s_processed_features_count",
            Gauge::AnomalyScore => "k8s_anomaly_score",
            Gauge::CorrelationScore => "k8s_correlation_score",
            Gauge::MetadataCount => "k8s_metadata_count",
            Gauge::OwnerReferenceCount => "k8s_owner_reference_count",
            Gauge::MetadataChangeRate => "k8s_metadata_change_rate",
        }
    }

    /// Label dimension of the gauge, if any
    pub fn label_name(&self) -> Option<&'static str> {
        match self {
            Gauge::ProcessedFeaturesCount => None,
            Gauge::CorrelationScore => Some("field_pair"),
            Gauge::AnomalyScore
            | Gauge::MetadataCount
            | Gauge::OwnerReferenceCount
            | Gauge::MetadataChangeRate => Some("resource_type"),
        }
    }
}

/// Sink for named numeric gauges
pub trait GaugeSink: Send + Sync {
    fn set_gauge(&self, gauge: Gauge, label: Option<&str>, value: f64) -> Result<()>;
}

/// Sink for feature and anomaly tables
pub trait TableSink: Send + Sync {
    /// Store the full feature table of a cycle
    fn store_features(&self, cycle_id: &str, table: &Table) -> Result<()>;

    /// Store the flagged rows of a cycle
    fn store_anomalies(&self, cycle_id: &str, table: &Table) -> Result<()>;
}
