//! Trend augmentation
//!
//! Appends an exponentially weighted moving average companion column for
//! every signal column, giving the scorer the recent baseline next to the
//! instantaneous level.

use super::matrix::FeatureMatrix;

/// Suffix of trend companion columns
pub const EWMA_SUFFIX: &str = "_ewma";

/// Default smoothing span in snapshots
pub const DEFAULT_EWMA_SPAN: usize = 3;

/// Exponentially weighted moving average seeded by the first value
///
/// `alpha = 2 / (span + 1)`. Observation `i` steps back carries weight
/// `(1 - alpha)^i` and every output is normalized by the sum of the weights
/// seen so far, so early rows are not biased towards the seed.
pub fn ewma(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut out = Vec::with_capacity(values.len());

    let mut numerator = 0.0;
    let mut weight = 0.0;
    for &value in values {
        numerator = value + decay * numerator;
        weight = 1.0 + decay * weight;
        out.push(numerator / weight);
    }

    out
}

/// Adds `<column>_ewma` columns to a feature matrix
#[derive(Debug, Clone)]
pub struct TrendAugmenter {
    span: usize,
}

impl TrendAugmenter {
    pub fn new(span: usize) -> Self {
        Self { span: span.max(1) }
    }

    pub fn span(&self) -> usize {
        self.span
    }

    /// Return a copy of `matrix` with one trend column per signal column
    pub fn augment(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        let mut augmented = matrix.clone();

        for column in matrix.columns() {
            let values = matrix.column(column).unwrap_or_default();
            augmented.push_column(format!("{column}{EWMA_SUFFIX}"), ewma(&values, self.span));
        }

        augmented
    }
}

impl Default for TrendAugmenter {
    fn default() -> Self {
        Self::new(DEFAULT_EWMA_SPAN)
    }
}
