//! Analysis library for cluster metadata snapshots
//!
//! This crate provides the core functionality for:
//! - Loading and normalizing resource metadata snapshots
//! - Building window-global feature matrices with trend columns
//! - Isolation-forest anomaly scoring
//! - Reporting to gauge and table sinks
//! - Health checks and observability

pub mod anomaly;
pub mod error;
pub mod features;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod snapshot;

pub use error::{AnalyzerError, Result};
pub use health::{
    ComponentStatus, HealthRegistry, HealthResponse, LastCycle, ReadinessResponse, Stage,
    StageHealth,
};
pub use models::*;
pub use observability::{AnalyzerMetrics, StructuredLogger};
pub use pipeline::{AnalysisEngine, CycleAnalysis, CycleError, CycleSummary, Pipeline};
