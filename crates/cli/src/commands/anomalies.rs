//! Anomaly scoring display

use analyzer_lib::anomaly::MIN_ROWS_FOR_SCORING;
use analyzer_lib::models::Snapshot;
use analyzer_lib::pipeline::AnalysisEngine;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_score, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the anomalies table
#[derive(Tabled, Serialize)]
struct AnomalyDisplayRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Anomaly")]
    anomaly: String,
}

/// JSON view of a scored window
#[derive(Serialize)]
struct AnomalyReport<'a> {
    threshold: Option<f64>,
    flagged: usize,
    rows: Vec<&'a analyzer_lib::anomaly::AnomalyRow>,
}

pub fn show_anomalies(
    snapshots: &[Snapshot],
    seed: u64,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let analysis = AnalysisEngine::with_seed(seed).analyze(snapshots)?;
    let scored = &analysis.scored;

    let rows: Vec<_> = scored
        .rows()
        .iter()
        .filter(|row| all || row.is_anomaly)
        .collect();

    match format {
        OutputFormat::Json => print_json(&AnomalyReport {
            threshold: (!scored.is_empty()).then(|| scored.threshold()),
            flagged: scored.n_flagged(),
            rows,
        })?,
        OutputFormat::Table => {
            if scored.is_empty() {
                print_warning(&format!(
                    "Not enough snapshots for anomaly detection (need at least {})",
                    MIN_ROWS_FOR_SCORING
                ));
                return Ok(());
            }

            println!("{}", "Anomaly Scores".bold());
            println!("Threshold: {:.4}", scored.threshold());
            println!();

            if rows.is_empty() {
                print_success("No anomalies detected");
                return Ok(());
            }

            let display: Vec<AnomalyDisplayRow> = rows
                .iter()
                .map(|row| AnomalyDisplayRow {
                    timestamp: row.features.timestamp.clone(),
                    score: color_score(row.anomaly_score, scored.threshold()),
                    anomaly: if row.is_anomaly {
                        "yes".red().bold().to_string()
                    } else {
                        "no".to_string()
                    },
                })
                .collect();

            print_table(&display, format);
            println!(
                "\n{} of {} snapshots flagged",
                scored.n_flagged(),
                scored.len()
            );
        }
    }

    Ok(())
}
