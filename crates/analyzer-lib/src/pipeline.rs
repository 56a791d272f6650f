//! One processing cycle, end to end
//!
//! Loads the window, builds and augments the feature matrix, scores it and
//! reports the results. Every cycle starts from scratch; the only state
//! shared between cycles lives in the sinks.

use crate::anomaly::{AnomalyScorer, ScoredMatrix, ScorerConfig};
use crate::error::AnalyzerError;
use crate::features::{build_matrix, FeatureMatrix, TrendAugmenter, DEFAULT_EWMA_SPAN};
use crate::health::Stage;
use crate::models::Snapshot;
use crate::report::{ReportingAdapter, ReportOutcome};
use crate::snapshot::{normalize_window, SnapshotCounters, SnapshotSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Default number of snapshots per window
pub const DEFAULT_WINDOW_SIZE: usize = 12;

/// Results of analyzing one window
#[derive(Debug, Clone, Default)]
pub struct CycleAnalysis {
    /// Normalized counters, one per distinct timestamp
    pub counters: Vec<SnapshotCounters>,
    /// Feature matrix including trend columns
    pub features: FeatureMatrix,
    pub scored: ScoredMatrix,
}

impl CycleAnalysis {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Latest counters and the ones right before them
    pub fn window_tail(&self) -> Option<(&SnapshotCounters, Option<&SnapshotCounters>)> {
        let (latest, rest) = self.counters.split_last()?;
        Some((latest, rest.last()))
    }
}

/// Feature extraction and scoring for a window of snapshots
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    augmenter: TrendAugmenter,
    scorer: AnomalyScorer,
}

impl AnalysisEngine {
    pub fn new(scorer: ScorerConfig, ewma_span: usize) -> Self {
        Self {
            augmenter: TrendAugmenter::new(ewma_span),
            scorer: AnomalyScorer::new(scorer),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(
            ScorerConfig {
                seed,
                ..Default::default()
            },
            DEFAULT_EWMA_SPAN,
        )
    }

    /// Analyze a window; an empty window yields an empty analysis
    ///
    /// Failures are tagged with the stage that raised them.
    pub fn analyze(&self, snapshots: &[Snapshot]) -> Result<CycleAnalysis, CycleError> {
        let counters = normalize_window(snapshots);
        if counters.is_empty() {
            return Ok(CycleAnalysis::default());
        }

        let matrix = build_matrix(&counters);
        debug!(
            rows = matrix.len(),
            columns = matrix.n_columns(),
            "Built feature matrix"
        );

        let features = self.augmenter.augment(&matrix);
        let dense = features
            .to_array()
            .map_err(CycleError::at(Stage::FeatureEngine))?;
        let scored = self
            .scorer
            .score_dense(&features, dense.view())
            .map_err(CycleError::at(Stage::Scorer))?;

        Ok(CycleAnalysis {
            counters,
            features,
            scored,
        })
    }
}

/// A cycle failure tagged with the stage that raised it
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct CycleError {
    pub stage: Stage,
    #[source]
    pub source: AnalyzerError,
}

impl CycleError {
    fn at(stage: Stage) -> impl FnOnce(AnalyzerError) -> Self {
        move |source| Self { stage, source }
    }
}

/// Summary of a completed cycle
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub cycle_id: String,
    pub snapshots: usize,
    /// Distinct timestamps in the window
    pub rows: usize,
    pub skipped: usize,
    pub report: ReportOutcome,
    pub anomalies: usize,
    /// Timestamp and score of the highest-scoring row
    pub top_anomaly: Option<(String, f64)>,
    /// Rows flagged in this cycle with their scores
    pub flagged: Vec<(String, f64)>,
    pub threshold: Option<f64>,
}

/// Source, engine and reporting wired together
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn SnapshotSource>,
    engine: AnalysisEngine,
    adapter: ReportingAdapter,
    window_size: usize,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        engine: AnalysisEngine,
        adapter: ReportingAdapter,
        window_size: usize,
    ) -> Self {
        Self {
            source,
            engine,
            adapter,
            window_size: window_size.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Run one cycle; cycles must not overlap
    pub fn run_cycle(&self, cycle_id: &str) -> Result<CycleSummary, CycleError> {
        let window = self
            .source
            .load_window(self.window_size)
            .map_err(CycleError::at(Stage::SnapshotStore))?;

        let mut summary = CycleSummary {
            cycle_id: cycle_id.to_string(),
            snapshots: window.snapshots.len(),
            skipped: window.skipped.len(),
            ..Default::default()
        };

        if window.is_empty() {
            info!(cycle_id = %cycle_id, "No snapshots available for processing");
            return Ok(summary);
        }

        let analysis = self.engine.analyze(&window.snapshots)?;
        summary.rows = analysis.features.len();

        summary.report = self
            .adapter
            .publish_cycle(cycle_id, &analysis.features, &analysis.scored)
            .map_err(CycleError::at(Stage::Sink))?;

        if let Some((latest, previous)) = analysis.window_tail() {
            self.adapter
                .publish_inventory(latest, previous)
                .map_err(CycleError::at(Stage::Sink))?;
        }

        summary.anomalies = analysis.scored.n_flagged();
        summary.top_anomaly = analysis
            .scored
            .top()
            .map(|row| (row.features.timestamp.clone(), row.anomaly_score));
        summary.flagged = analysis
            .scored
            .flagged()
            .map(|row| (row.features.timestamp.clone(), row.anomaly_score))
            .collect();
        summary.threshold = (!analysis.scored.is_empty()).then(|| analysis.scored.threshold());

        Ok(summary)
    }
}
