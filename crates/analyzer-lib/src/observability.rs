//! Observability infrastructure for the metadata analyzer
//!
//! Provides:
//! - Prometheus gauges for the analysis results (feature count, anomaly
//!   score, inventory per resource type)
//! - Processing-cycle metrics (duration, skipped snapshots, errors)
//! - Structured JSON logging with tracing

use crate::error::Result;
use crate::report::{Gauge, GaugeSink};
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter,
    register_int_gauge, Encoder, Gauge as PromGauge, GaugeVec, Histogram, IntCounter, IntGauge,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle durations (in seconds)
const CYCLE_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AnalyzerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AnalyzerMetricsInner {
    processed_features_count: PromGauge,
    anomaly_score: GaugeVec,
    correlation_score: GaugeVec,
    metadata_count: GaugeVec,
    owner_reference_count: GaugeVec,
    metadata_change_rate: GaugeVec,
    cycle_duration_seconds: Histogram,
    snapshots_skipped: IntCounter,
    anomalies_flagged: IntGauge,
    cycle_errors: IntCounter,
}

impl AnalyzerMetricsInner {
    fn new() -> Self {
        Self {
            processed_features_count: register_gauge!(
                Gauge::ProcessedFeaturesCount.name(),
                "Count of processed features"
            )
            .expect("Failed to register processed_features_count"),

            anomaly_score: register_gauge_vec!(
                Gauge::AnomalyScore.name(),
                "Anomaly score from isolation forest",
                &["resource_type"]
            )
            .expect("Failed to register anomaly_score"),

            correlation_score: register_gauge_vec!(
                Gauge::CorrelationScore.name(),
                "Correlation score between metadata fields",
                &["field_pair"]
            )
            .expect("Failed to register correlation_score"),

            metadata_count: register_gauge_vec!(
                Gauge::MetadataCount.name(),
                "Count of Kubernetes resources",
                &["resource_type"]
            )
            .expect("Failed to register metadata_count"),

            owner_reference_count: register_gauge_vec!(
                Gauge::OwnerReferenceCount.name(),
                "Count of owner references",
                &["resource_type"]
            )
            .expect("Failed to register owner_reference_count"),

            metadata_change_rate: register_gauge_vec!(
                Gauge::MetadataChangeRate.name(),
                "Rate of changes in Kubernetes resources",
                &["resource_type"]
            )
            .expect("Failed to register metadata_change_rate"),

            cycle_duration_seconds: register_histogram!(
                "metadata_analyzer_cycle_duration_seconds",
                "Time spent on one processing cycle",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            snapshots_skipped: register_int_counter!(
                "metadata_analyzer_snapshots_skipped_total",
                "Snapshot files skipped because they could not be read"
            )
            .expect("Failed to register snapshots_skipped"),

            anomalies_flagged: register_int_gauge!(
                "metadata_analyzer_anomalies_flagged",
                "Rows flagged as anomalous in the latest cycle"
            )
            .expect("Failed to register anomalies_flagged"),

            cycle_errors: register_int_counter!(
                "metadata_analyzer_cycle_errors_total",
                "Processing cycles that failed"
            )
            .expect("Failed to register cycle_errors"),
        }
    }

    fn labelled(&self, gauge: Gauge) -> Option<&GaugeVec> {
        match gauge {
            Gauge::ProcessedFeaturesCount => None,
            Gauge::AnomalyScore => Some(&self.anomaly_score),
            Gauge::CorrelationScore => Some(&self.correlation_score),
            Gauge::MetadataCount => Some(&self.metadata_count),
            Gauge::OwnerReferenceCount => Some(&self.owner_reference_count),
            Gauge::MetadataChangeRate => Some(&self.metadata_change_rate),
        }
    }
}

/// Analyzer metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AnalyzerMetrics {
    _private: (),
}

impl Default for AnalyzerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AnalyzerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_cycle_duration(&self, duration_secs: f64) {
        self.inner().cycle_duration_seconds.observe(duration_secs);
    }

    pub fn add_snapshots_skipped(&self, count: u64) {
        self.inner().snapshots_skipped.inc_by(count);
    }

    pub fn set_anomalies_flagged(&self, count: i64) {
        self.inner().anomalies_flagged.set(count);
    }

    pub fn inc_cycle_errors(&self) {
        self.inner().cycle_errors.inc();
    }

    /// Render the registry in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl GaugeSink for AnalyzerMetrics {
    fn set_gauge(&self, gauge: Gauge, label: Option<&str>, value: f64) -> Result<()> {
        let inner = self.inner();
        match inner.labelled(gauge) {
            None => inner.processed_features_count.set(value),
            Some(vec) => {
                let label = label.unwrap_or(crate::report::OVERALL_LABEL);
                vec.get_metric_with_label_values(&[label])?.set(value);
            }
        }
        Ok(())
    }
}

/// Structured logger for analyzer events
///
/// Provides consistent JSON-formatted logging for cycles, anomalies and
/// skipped input.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a completed processing cycle
    pub fn log_cycle_complete(
        &self,
        cycle_id: &str,
        snapshots: usize,
        features: usize,
        anomalies: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "cycle_complete",
            instance = %self.instance,
            cycle_id = %cycle_id,
            snapshots = snapshots,
            features = features,
            anomalies = anomalies,
            elapsed_ms = elapsed_ms as u64,
            "Processing complete. Found {} potential anomalies",
            anomalies
        );
    }

    /// Log a flagged window row
    pub fn log_anomaly(&self, timestamp: &str, score: f64, threshold: f64) {
        warn!(
            event = "anomaly_detected",
            instance = %self.instance,
            timestamp = %timestamp,
            anomaly_score = score,
            threshold = threshold,
            "Structural anomaly detected"
        );
    }

    /// Log a cycle with no snapshots to process
    pub fn log_empty_window(&self, input_dir: &str) {
        warn!(
            event = "empty_window",
            instance = %self.instance,
            input_dir = %input_dir,
            "No snapshots available for processing"
        );
    }

    /// Log a failed processing cycle
    pub fn log_cycle_failed(&self, cycle_id: &str, error: &str) {
        warn!(
            event = "cycle_failed",
            instance = %self.instance,
            cycle_id = %cycle_id,
            error = %error,
            "Processing cycle failed"
        );
    }

    /// Log analyzer startup
    pub fn log_startup(&self, version: &str, window_size: usize) {
        info!(
            event = "analyzer_started",
            instance = %self.instance,
            analyzer_version = %version,
            window_size = window_size,
            "Metadata analyzer started"
        );
    }

    /// Log analyzer shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "analyzer_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Metadata analyzer shutting down"
        );
    }
}
