//! Feature matrix display

use analyzer_lib::features::{extract_features, TrendAugmenter};
use analyzer_lib::models::Snapshot;
use anyhow::Result;
use colored::Colorize;

use crate::output::{print_json, print_rows, print_warning, OutputFormat};

pub fn show_features(snapshots: &[Snapshot], format: OutputFormat) -> Result<()> {
    let matrix = TrendAugmenter::default().augment(&extract_features(snapshots));

    match format {
        OutputFormat::Json => print_json(&matrix)?,
        OutputFormat::Table => {
            if matrix.is_empty() {
                print_warning("No snapshots found");
                return Ok(());
            }

            println!("{}", "Feature Matrix".bold());
            print_rows(&matrix.to_table());
            println!(
                "\n{} rows, {} features",
                matrix.len(),
                matrix.n_columns()
            );
        }
    }

    Ok(())
}
