//! Error types for the analysis engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the analysis engine and its sinks
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    MalformedSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid feature matrix shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("sink rejected {table} table: {reason}")]
    Sink { table: &'static str, reason: String },

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl AnalyzerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
