//! Health of the analyzer's processing stages
//!
//! Every cycle reports its outcome here. A failed cycle marks the stage that
//! raised the error unhealthy. A completed cycle resets every stage and then
//! degrades the ones that ran on incomplete input: skipped snapshot files,
//! an empty window, or too few rows for the scorer.

use crate::anomaly::MIN_ROWS_FOR_SCORING;
use crate::pipeline::{CycleError, CycleSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Ran, but on incomplete input
    Degraded,
    /// Failed in the latest cycle
    Unhealthy,
}

/// Stages of a processing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SnapshotStore,
    FeatureEngine,
    Scorer,
    Sink,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::SnapshotStore,
        Stage::FeatureEngine,
        Stage::Scorer,
        Stage::Sink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::SnapshotStore => "snapshot_store",
            Stage::FeatureEngine => "feature_engine",
            Stage::Scorer => "scorer",
            Stage::Sink => "sink",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of one stage as of the latest cycle that touched it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Cycle that last updated the stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<String>,
    pub updated_at: i64,
}

impl StageHealth {
    fn new(status: ComponentStatus, message: Option<String>, cycle_id: Option<&str>) -> Self {
        Self {
            status,
            message,
            cycle_id: cycle_id.map(str::to_string),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    fn healthy(cycle_id: Option<&str>) -> Self {
        Self::new(ComponentStatus::Healthy, None, cycle_id)
    }
}

/// Outline of the most recent completed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastCycle {
    pub cycle_id: String,
    pub snapshots: usize,
    pub rows: usize,
    pub anomalies: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_anomaly: Option<String>,
    pub completed_at: i64,
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub stages: BTreeMap<Stage, StageHealth>,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<LastCycle>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
struct HealthState {
    stages: BTreeMap<Stage, StageHealth>,
    ready: bool,
    consecutive_failures: u32,
    last_cycle: Option<LastCycle>,
}

impl HealthState {
    /// Worst status across stages
    fn overall(&self) -> ComponentStatus {
        let mut overall = ComponentStatus::Healthy;
        for health in self.stages.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => overall = ComponentStatus::Degraded,
                ComponentStatus::Healthy => {}
            }
        }
        overall
    }
}

/// Shared view of stage health, updated once per cycle
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// All stages start healthy; the registry is not ready until told so
    pub fn new() -> Self {
        let stages = Stage::ALL
            .into_iter()
            .map(|stage| (stage, StageHealth::healthy(None)))
            .collect();

        Self {
            state: Arc::new(RwLock::new(HealthState {
                stages,
                ready: false,
                consecutive_failures: 0,
                last_cycle: None,
            })),
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    /// Apply the outcome of a completed cycle
    pub async fn record_success(&self, summary: &CycleSummary) {
        let cycle = Some(summary.cycle_id.as_str());
        let mut state = self.state.write().await;

        for stage in Stage::ALL {
            state.stages.insert(stage, StageHealth::healthy(cycle));
        }

        let mut store_notes = Vec::new();
        if summary.skipped > 0 {
            store_notes.push(format!("{} snapshot files skipped", summary.skipped));
        }
        if summary.snapshots == 0 {
            store_notes.push("no readable snapshots in window".to_string());
        }
        if !store_notes.is_empty() {
            let message = store_notes.join("; ");
            state.stages.insert(
                Stage::SnapshotStore,
                StageHealth::new(ComponentStatus::Degraded, Some(message), cycle),
            );
        }

        if summary.snapshots > 0 && summary.rows < MIN_ROWS_FOR_SCORING {
            let message = format!(
                "window has {} rows, scoring needs {}",
                summary.rows, MIN_ROWS_FOR_SCORING
            );
            state.stages.insert(
                Stage::Scorer,
                StageHealth::new(ComponentStatus::Degraded, Some(message), cycle),
            );
        }

        state.consecutive_failures = 0;
        state.last_cycle = Some(LastCycle {
            cycle_id: summary.cycle_id.clone(),
            snapshots: summary.snapshots,
            rows: summary.rows,
            anomalies: summary.anomalies,
            top_anomaly: summary.top_anomaly.as_ref().map(|(ts, _)| ts.clone()),
            completed_at: chrono::Utc::now().timestamp(),
        });
    }

    /// Mark the stage that failed `cycle_id` unhealthy
    pub async fn record_failure(&self, cycle_id: &str, error: &CycleError) {
        let mut state = self.state.write().await;
        state.stages.insert(
            error.stage,
            StageHealth::new(
                ComponentStatus::Unhealthy,
                Some(error.source.to_string()),
                Some(cycle_id),
            ),
        );
        state.consecutive_failures += 1;
    }

    pub async fn last_cycle(&self) -> Option<LastCycle> {
        self.state.read().await.last_cycle.clone()
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            stages: state.stages.clone(),
            consecutive_failures: state.consecutive_failures,
            last_cycle: state.last_cycle.clone(),
        }
    }

    /// Ready once initialized and while no stage is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        if !state.ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Analyzer not yet initialized".to_string()),
            };
        }

        let failing: Vec<&str> = state
            .stages
            .iter()
            .filter(|(_, h)| h.status == ComponentStatus::Unhealthy)
            .map(|(stage, _)| stage.as_str())
            .collect();

        if failing.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Unhealthy stages: {}", failing.join(", "))),
            }
        }
    }
}
