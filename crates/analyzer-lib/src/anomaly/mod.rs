//! Anomaly detection over feature matrices
//!
//! This module provides:
//! - Per-window standardization
//! - A seeded isolation forest
//! - Window-local percentile flagging
//! - Cramér's V for categorical fields

mod correlation;
mod isolation_forest;
mod scaler;
mod scorer;

pub use correlation::{cramers_v, field_pair_label};
pub use isolation_forest::{average_path_length, IsolationForest, IsolationTree};
pub use scaler::StandardScaler;
pub use scorer::{
    percentile, AnomalyRow, AnomalyScorer, ScoredMatrix, ScorerConfig, ANOMALY_SCORE_COLUMN,
    DEFAULT_CONTAMINATION, DEFAULT_FLAG_PERCENTILE, DEFAULT_MAX_SAMPLES, DEFAULT_N_ESTIMATORS,
    DEFAULT_SEED, IS_ANOMALY_COLUMN, MIN_ROWS_FOR_SCORING,
};
