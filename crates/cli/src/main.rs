//! Metadata Analyzer CLI
//!
//! One-shot inspection of a directory of metadata snapshots: resource
//! inventory, the derived feature matrix and scored anomalies.

mod commands;
mod output;

use analyzer_lib::anomaly::DEFAULT_SEED;
use analyzer_lib::pipeline::DEFAULT_WINDOW_SIZE;
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{anomalies, features, inventory};
use std::path::PathBuf;

/// Metadata Analyzer CLI
#[derive(Parser)]
#[command(name = "mda")]
#[command(author, version, about = "CLI for the Cluster Metadata Analyzer", long_about = None)]
pub struct Cli {
    /// Directory holding metadata snapshot files (can also be set via MDA_INPUT_DIR)
    #[arg(long, short, env = "MDA_INPUT_DIR", default_value = "/data")]
    pub input: PathBuf,

    /// Number of most recent snapshots to analyze
    #[arg(long, short, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window: usize,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show per-snapshot resource totals
    Inventory,

    /// Show the feature matrix including trend columns
    Features,

    /// Score the window and show anomalous snapshots
    Anomalies {
        /// Seed for the isolation forest
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Show every scored snapshot, not only flagged ones
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let window = commands::load_window(&cli.input, cli.window, cli.format)?;

    match cli.command {
        Commands::Inventory => inventory::show_inventory(&window.snapshots, cli.format)?,
        Commands::Features => features::show_features(&window.snapshots, cli.format)?,
        Commands::Anomalies { seed, all } => {
            anomalies::show_anomalies(&window.snapshots, seed, all, cli.format)?
        }
    }

    Ok(())
}
