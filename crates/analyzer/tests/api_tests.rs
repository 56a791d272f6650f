//! Integration tests for the analyzer API endpoints

#[path = "../src/api.rs"]
#[allow(dead_code)]
mod api;

use analyzer_lib::{
    health::{HealthRegistry, Stage},
    observability::AnalyzerMetrics,
    pipeline::{CycleError, CycleSummary},
    report::{Gauge, GaugeSink},
    AnalyzerError,
};
use api::{create_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();

    let metrics = AnalyzerMetrics::new();
    let state = Arc::new(AppState::new(health_registry, metrics));
    let router = create_router(state.clone());

    (router, state)
}

fn summary(cycle_id: &str, snapshots: usize, rows: usize, skipped: usize) -> CycleSummary {
    CycleSummary {
        cycle_id: cycle_id.to_string(),
        snapshots,
        rows,
        skipped,
        ..Default::default()
    }
}

fn failure(stage: Stage) -> CycleError {
    CycleError {
        stage,
        source: AnalyzerError::Sink {
            table: "features",
            reason: "disk full".to_string(),
        },
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .record_success(&summary("20240101_000000", 3, 3, 2))
        .await;

    // Degraded still returns 200 (operational)
    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(
        health["stages"]["snapshot_store"]["message"],
        "2 snapshot files skipped"
    );
    assert_eq!(health["stages"]["scorer"]["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_503_when_sink_fails() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .record_failure("20240101_000000", &failure(Stage::Sink))
        .await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["stages"]["sink"]["cycle_id"], "20240101_000000");
    assert_eq!(health["consecutive_failures"], 1);
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app().await;
    state.health_registry.set_ready(true).await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);

    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_returns_503_when_ready_but_unhealthy() {
    let (app, state) = setup_test_app().await;

    state.health_registry.set_ready(true).await;
    state
        .health_registry
        .record_failure("20240101_000000", &failure(Stage::FeatureEngine))
        .await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["reason"], "Unhealthy stages: feature_engine");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_analysis_gauges() {
    let (app, state) = setup_test_app().await;

    state
        .metrics
        .set_gauge(Gauge::ProcessedFeaturesCount, None, 6.0)
        .unwrap();
    state
        .metrics
        .set_gauge(Gauge::AnomalyScore, Some("overall"), 0.42)
        .unwrap();
    state
        .metrics
        .set_gauge(Gauge::MetadataCount, Some("pods"), 50.0)
        .unwrap();
    state.metrics.set_anomalies_flagged(1);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("k8s_processed_features_count 6"));
    assert!(metrics_text.contains("k8s_anomaly_score{resource_type=\"overall\"} 0.42"));
    assert!(metrics_text.contains("k8s_metadata_count{resource_type=\"pods\"} 50"));
    assert!(metrics_text.contains("metadata_analyzer_anomalies_flagged 1"));
}

#[tokio::test]
async fn test_metrics_contains_histogram_buckets() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_cycle_duration(0.001);
    state.metrics.observe_cycle_duration(0.2);

    let (_, body) = get(app, "/metrics").await;
    let metrics_text = String::from_utf8(body).unwrap();

    assert!(metrics_text.contains("metadata_analyzer_cycle_duration_seconds_bucket"));
    assert!(metrics_text.contains("metadata_analyzer_cycle_duration_seconds_count"));
    assert!(metrics_text.contains("metadata_analyzer_cycle_duration_seconds_sum"));
}

#[tokio::test]
async fn test_healthz_lists_every_stage() {
    let (app, _state) = setup_test_app().await;

    let (_, body) = get(app, "/healthz").await;
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert!(health["stages"].is_object());
    for stage in Stage::ALL {
        assert!(health["stages"][stage.as_str()].is_object());
    }
}

#[tokio::test]
async fn test_last_cycle_is_404_before_first_cycle() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/cycles/last").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["reason"], "no cycle has completed yet");
}

#[tokio::test]
async fn test_last_cycle_reports_completed_cycle() {
    let (app, state) = setup_test_app().await;

    let mut completed = summary("20240101_001000", 3, 3, 0);
    completed.anomalies = 1;
    completed.top_anomaly = Some(("20240101_000200".to_string(), 0.61));
    state.health_registry.record_success(&completed).await;
    state
        .health_registry
        .record_failure("20240101_002000", &failure(Stage::Sink))
        .await;

    let (status, body) = get(app, "/cycles/last").await;
    assert_eq!(status, StatusCode::OK);

    let cycle: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(cycle["cycle_id"], "20240101_001000");
    assert_eq!(cycle["rows"], 3);
    assert_eq!(cycle["anomalies"], 1);
    assert_eq!(cycle["top_anomaly"], "20240101_000200");
}
