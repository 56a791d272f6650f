//! Metadata Analyzer - structural anomaly detection for cluster metadata
//!
//! This binary periodically reads the most recent metadata snapshots,
//! derives a feature matrix, scores it with an isolation forest and
//! publishes the results as Prometheus gauges and CSV tables.

use analyzer_lib::{
    health::HealthRegistry,
    observability::{AnalyzerMetrics, StructuredLogger},
    pipeline::{AnalysisEngine, Pipeline},
    report::{cycle_id, CsvTableSink, ReportingAdapter},
    snapshot::FileSnapshotStore,
};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a cycle reports to besides the sinks
struct CycleContext {
    health: HealthRegistry,
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
    input_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting metadata-analyzer");

    let config = config::AnalyzerConfig::load()?;
    info!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        interval_secs = config.processing_interval_secs,
        "Analyzer configured"
    );

    let health_registry = HealthRegistry::new();

    let metrics = AnalyzerMetrics::new();
    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(ANALYZER_VERSION, config.window_size);

    let sink = CsvTableSink::new(&config.output_dir).with_retention(config.retention);
    let adapter = ReportingAdapter::new(Arc::new(metrics.clone()), Arc::new(sink));
    let pipeline = Pipeline::new(
        Arc::new(FileSnapshotStore::new(&config.input_dir)),
        AnalysisEngine::with_seed(config.seed),
        adapter,
        config.window_size,
    );

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let ctx = CycleContext {
        health: health_registry,
        metrics,
        logger,
        input_dir: config.input_dir.display().to_string(),
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(config.processing_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => process_cycle(&pipeline, &ctx).await,
            _ = tokio::signal::ctrl_c() => {
                ctx.logger.log_shutdown("SIGINT received");
                break;
            }
        }
    }

    api_handle.abort();
    info!("Shutting down");

    Ok(())
}

/// Run one cycle on the blocking pool and record its outcome
async fn process_cycle(pipeline: &Pipeline, ctx: &CycleContext) {
    let id = cycle_id(Utc::now());
    let started = Instant::now();

    let worker = pipeline.clone();
    let worker_id = id.clone();
    let outcome = tokio::task::spawn_blocking(move || worker.run_cycle(&worker_id)).await;

    let elapsed = started.elapsed();
    ctx.metrics.observe_cycle_duration(elapsed.as_secs_f64());

    let summary = match outcome {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            ctx.metrics.inc_cycle_errors();
            ctx.health.record_failure(&id, &e).await;
            ctx.logger.log_cycle_failed(&id, &e.to_string());
            return;
        }
        Err(e) => {
            error!(error = %e, "Processing task panicked");
            ctx.metrics.inc_cycle_errors();
            ctx.logger.log_cycle_failed(&id, &e.to_string());
            return;
        }
    };

    ctx.health.record_success(&summary).await;
    if summary.skipped > 0 {
        ctx.metrics.add_snapshots_skipped(summary.skipped as u64);
    }

    if summary.snapshots == 0 {
        ctx.logger.log_empty_window(&ctx.input_dir);
        return;
    }

    ctx.metrics.set_anomalies_flagged(summary.anomalies as i64);
    if let Some(threshold) = summary.threshold {
        for (timestamp, score) in &summary.flagged {
            ctx.logger.log_anomaly(timestamp, *score, threshold);
        }
    }

    ctx.logger.log_cycle_complete(
        &id,
        summary.snapshots,
        summary.report.feature_count,
        summary.anomalies,
        elapsed.as_millis(),
    );
}
