//! Feature extraction
//!
//! Turns a window of snapshots into a fixed-schema numeric matrix and
//! augments it with trend columns for anomaly scoring.

mod builder;
mod matrix;
mod trend;

pub use builder::{
    build_matrix, count_column, extract_features, owner_refs_column, version_changes,
    VERSION_CHANGE_RATE,
};
pub use matrix::{format_value, FeatureMatrix, FeatureRow, TIMESTAMP_COLUMN};
pub use trend::{ewma, TrendAugmenter, DEFAULT_EWMA_SPAN, EWMA_SUFFIX};
