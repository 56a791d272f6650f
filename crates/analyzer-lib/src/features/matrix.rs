//! Window-global feature matrix

use crate::error::Result;
use crate::models::Table;
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;

/// Name of the row key column in rendered tables
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// One row of the feature matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub timestamp: String,
    pub values: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Feature table keyed by timestamp with a fixed column set
///
/// Every row carries a value for every column; cells absent at construction
/// are stored as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, zero-filling any column without a value
    pub fn push_row(&mut self, timestamp: impl Into<String>, mut values: BTreeMap<String, f64>) {
        for column in &self.columns {
            values.entry(column.clone()).or_insert(0.0);
        }
        values.retain(|column, _| self.columns.contains(column));

        self.rows.push(FeatureRow {
            timestamp: timestamp.into(),
            values,
        });
    }

    /// Append a column; `values` holds one entry per row in row order
    pub(crate) fn push_column(&mut self, name: String, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values.insert(name.clone(), value);
        }
        self.columns.push(name);
    }

    /// Column names in stable positional order (timestamp excluded)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of non-timestamp columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Values of one column in row order
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if !self.columns.iter().any(|c| c == name) {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(name).unwrap_or(0.0))
                .collect(),
        )
    }

    /// Dense rows × columns array in column order
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let data: Vec<f64> = self
            .rows
            .iter()
            .flat_map(|row| {
                self.columns
                    .iter()
                    .map(move |column| row.get(column).unwrap_or(0.0))
            })
            .collect();

        Ok(Array2::from_shape_vec(
            (self.rows.len(), self.columns.len()),
            data,
        )?)
    }

    /// Render as a table with a leading timestamp column
    pub fn to_table(&self) -> Table {
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(TIMESTAMP_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|row| self.render_row(row))
            .collect();

        Table { header, rows }
    }

    pub(crate) fn render_row(&self, row: &FeatureRow) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.columns.len() + 1);
        cells.push(row.timestamp.clone());
        cells.extend(
            self.columns
                .iter()
                .map(|column| format_value(row.get(column).unwrap_or(0.0))),
        );
        cells
    }
}

/// Format a cell value; integral values are written without a fraction
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
