//! Window-local anomaly scoring
//!
//! Standardizes the augmented feature matrix, fits a seeded isolation forest
//! on it and flags rows whose score exceeds the window's 90th percentile.
//! The threshold is relative, so roughly a tenth of any sufficiently large
//! window is flagged.

use super::isolation_forest::IsolationForest;
use super::scaler::StandardScaler;
use crate::error::Result;
use crate::features::{format_value, FeatureMatrix, FeatureRow, TIMESTAMP_COLUMN};
use crate::models::Table;
use ndarray::{ArrayView2, ErrorKind, ShapeError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, warn};

/// Minimum rows required for scoring
pub const MIN_ROWS_FOR_SCORING: usize = 2;

pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;
pub const DEFAULT_CONTAMINATION: f64 = 0.1;
pub const DEFAULT_FLAG_PERCENTILE: f64 = 90.0;
pub const DEFAULT_SEED: u64 = 42;

/// Column carrying the anomaly score in rendered tables
pub const ANOMALY_SCORE_COLUMN: &str = "anomaly_score";
/// Column carrying the anomaly flag in rendered tables
pub const IS_ANOMALY_COLUMN: &str = "is_anomaly";

/// Scorer configuration
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    /// Percentile of window scores a row must exceed to be flagged
    pub flag_percentile: f64,
    pub seed: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: DEFAULT_CONTAMINATION,
            flag_percentile: DEFAULT_FLAG_PERCENTILE,
            seed: DEFAULT_SEED,
        }
    }
}

/// A feature row with its anomaly verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    #[serde(flatten)]
    pub features: FeatureRow,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

/// Scored rows of one window
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoredMatrix {
    columns: Vec<String>,
    rows: Vec<AnomalyRow>,
    threshold: f64,
}

impl ScoredMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[AnomalyRow] {
        &self.rows
    }

    /// Score a row must exceed to be flagged
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn flagged(&self) -> impl Iterator<Item = &AnomalyRow> {
        self.rows.iter().filter(|row| row.is_anomaly)
    }

    pub fn n_flagged(&self) -> usize {
        self.flagged().count()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.anomaly_score).collect()
    }

    pub fn mean_score(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        Some(self.rows.iter().map(|row| row.anomaly_score).sum::<f64>() / self.rows.len() as f64)
    }

    /// Highest-scoring row
    pub fn top(&self) -> Option<&AnomalyRow> {
        self.rows.iter().max_by(|a, b| {
            a.anomaly_score
                .partial_cmp(&b.anomaly_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Render flagged rows (or all rows) with score and flag columns
    pub fn to_table(&self, flagged_only: bool) -> Table {
        let mut header = Vec::with_capacity(self.columns.len() + 3);
        header.push(TIMESTAMP_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        header.push(ANOMALY_SCORE_COLUMN.to_string());
        header.push(IS_ANOMALY_COLUMN.to_string());

        let rows = self
            .rows
            .iter()
            .filter(|row| !flagged_only || row.is_anomaly)
            .map(|row| {
                let mut cells = Vec::with_capacity(header.len());
                cells.push(row.features.timestamp.clone());
                cells.extend(
                    self.columns
                        .iter()
                        .map(|c| format_value(row.features.get(c).unwrap_or(0.0))),
                );
                cells.push(row.anomaly_score.to_string());
                cells.push(row.is_anomaly.to_string());
                cells
            })
            .collect();

        Table { header, rows }
    }
}

/// Isolation-forest scorer for augmented feature matrices
#[derive(Debug, Clone, Default)]
pub struct AnomalyScorer {
    config: ScorerConfig,
}

impl AnomalyScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(ScorerConfig {
            seed,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score every row using a generator seeded from the configuration
    pub fn score(&self, matrix: &FeatureMatrix) -> Result<ScoredMatrix> {
        let x = matrix.to_array()?;
        self.score_dense(matrix, x.view())
    }

    /// Score `matrix` given its dense form `x`, one row per matrix row
    pub fn score_dense(
        &self,
        matrix: &FeatureMatrix,
        x: ArrayView2<'_, f64>,
    ) -> Result<ScoredMatrix> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.score_with_rng(matrix, x, &mut rng)
    }

    /// Score every row drawing tree randomness from `rng`
    pub fn score_with_rng<R: Rng + ?Sized>(
        &self,
        matrix: &FeatureMatrix,
        x: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> Result<ScoredMatrix> {
        if matrix.len() < MIN_ROWS_FOR_SCORING {
            warn!(
                rows = matrix.len(),
                required = MIN_ROWS_FOR_SCORING,
                "Not enough data for anomaly detection"
            );
            return Ok(ScoredMatrix::empty());
        }

        if x.dim() != (matrix.len(), matrix.n_columns()) {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }

        let scaled = StandardScaler::fit_transform(x);

        let mut forest = IsolationForest::new()
            .with_n_estimators(self.config.n_estimators)
            .with_max_samples(self.config.max_samples)
            .with_contamination(self.config.contamination);
        let scores = forest.fit_score(scaled.view(), rng);
        let threshold = percentile(&scores, self.config.flag_percentile);

        debug!(
            rows = scores.len(),
            features = matrix.n_columns(),
            sample_size = forest.sample_size(),
            contamination_offset = ?forest.offset(),
            threshold = threshold,
            "Fitted isolation forest"
        );

        let rows = matrix
            .rows()
            .iter()
            .zip(scores)
            .map(|(row, score)| AnomalyRow {
                features: row.clone(),
                anomaly_score: score,
                is_anomaly: score > threshold,
            })
            .collect();

        Ok(ScoredMatrix {
            columns: matrix.columns().to_vec(),
            rows,
            threshold,
        })
    }
}

/// Percentile with linear interpolation between order statistics
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
