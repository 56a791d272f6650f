//! Maps cycle results onto the gauge and table sinks

use super::{Gauge, GaugeSink, TableSink};
use crate::anomaly::ScoredMatrix;
use crate::error::Result;
use crate::features::FeatureMatrix;
use crate::snapshot::SnapshotCounters;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Label of the window-wide anomaly score
pub const OVERALL_LABEL: &str = "overall";

/// What a cycle handed to the sinks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOutcome {
    pub features_stored: bool,
    pub anomalies_stored: usize,
    pub feature_count: usize,
    pub mean_score: Option<f64>,
}

/// Publishes cycle summaries and tables
#[derive(Clone)]
pub struct ReportingAdapter {
    gauges: Arc<dyn GaugeSink>,
    tables: Arc<dyn TableSink>,
}

impl ReportingAdapter {
    pub fn new(gauges: Arc<dyn GaugeSink>, tables: Arc<dyn TableSink>) -> Self {
        Self { gauges, tables }
    }

    /// Publish the feature count and mean score, then store the tables
    ///
    /// An empty feature matrix is a no-op. The anomaly table is only stored
    /// when at least one row is flagged.
    pub fn publish_cycle(
        &self,
        cycle_id: &str,
        features: &FeatureMatrix,
        scored: &ScoredMatrix,
    ) -> Result<ReportOutcome> {
        if features.is_empty() {
            debug!(cycle_id = %cycle_id, "Empty feature matrix, nothing to report");
            return Ok(ReportOutcome::default());
        }

        let mut outcome = ReportOutcome {
            feature_count: features.n_columns(),
            mean_score: scored.mean_score(),
            ..Default::default()
        };

        self.gauges.set_gauge(
            Gauge::ProcessedFeaturesCount,
            None,
            outcome.feature_count as f64,
        )?;
        if let Some(mean) = outcome.mean_score {
            self.gauges
                .set_gauge(Gauge::AnomalyScore, Some(OVERALL_LABEL), mean)?;
        }

        self.tables.store_features(cycle_id, &features.to_table())?;
        outcome.features_stored = true;

        let anomalies = scored.to_table(true);
        if !anomalies.is_empty() {
            self.tables.store_anomalies(cycle_id, &anomalies)?;
            outcome.anomalies_stored = anomalies.rows.len();
        }

        Ok(outcome)
    }

    /// Publish per-type inventory gauges for the latest snapshot
    ///
    /// `previous` is the snapshot before it in the window; without one no
    /// change rate is published.
    pub fn publish_inventory(
        &self,
        latest: &SnapshotCounters,
        previous: Option<&SnapshotCounters>,
    ) -> Result<()> {
        let mut resource_types: BTreeSet<&str> =
            latest.resource_count.keys().map(String::as_str).collect();
        if let Some(previous) = previous {
            resource_types.extend(previous.resource_count.keys().map(String::as_str));
        }

        for resource_type in resource_types {
            let count = latest.count_of(resource_type);
            let owner_refs = latest
                .owner_ref_count
                .get(resource_type)
                .copied()
                .unwrap_or(0);

            self.gauges
                .set_gauge(Gauge::MetadataCount, Some(resource_type), count as f64)?;
            self.gauges.set_gauge(
                Gauge::OwnerReferenceCount,
                Some(resource_type),
                owner_refs as f64,
            )?;

            if let Some(previous) = previous {
                let change = count.abs_diff(previous.count_of(resource_type));
                self.gauges.set_gauge(
                    Gauge::MetadataChangeRate,
                    Some(resource_type),
                    change as f64,
                )?;
            }
        }

        Ok(())
    }

    /// Publish categorical association scores keyed by field pair
    pub fn publish_correlations(&self, correlations: &BTreeMap<String, f64>) -> Result<()> {
        for (field_pair, score) in correlations {
            self.gauges
                .set_gauge(Gauge::CorrelationScore, Some(field_pair), *score)?;
        }
        Ok(())
    }
}
