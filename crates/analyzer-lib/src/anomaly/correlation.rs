//! Categorical association (Cramér's V)
//!
//! Not part of the default processing cycle. Reported through the
//! `field_pair` gauge when a caller has categorical fields to compare.

use std::collections::BTreeMap;

/// Bias-corrected Cramér's V between two categorical series
///
/// Returns `None` when the series differ in length, hold fewer than two
/// observations, or either side collapses to a single category.
pub fn cramers_v<A: Ord, B: Ord>(a: &[A], b: &[B]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let row_index = category_index(a);
    let col_index = category_index(b);
    let (r, k) = (row_index.len(), col_index.len());

    let mut observed = vec![vec![0.0_f64; k]; r];
    for (x, y) in a.iter().zip(b) {
        observed[row_index[x]][col_index[y]] += 1.0;
    }

    let n = a.len() as f64;
    let chi2 = chi_square(&observed, n);

    let (r_f, k_f) = (r as f64, k as f64);
    let phi2 = chi2 / n;
    let phi2_corr = (phi2 - ((k_f - 1.0) * (r_f - 1.0)) / (n - 1.0)).max(0.0);
    let r_corr = r_f - (r_f - 1.0).powi(2) / (n - 1.0);
    let k_corr = k_f - (k_f - 1.0).powi(2) / (n - 1.0);

    let denominator = (k_corr - 1.0).min(r_corr - 1.0);
    if denominator <= 0.0 {
        return None;
    }

    Some((phi2_corr / denominator).sqrt())
}

/// Gauge label for a pair of fields
pub fn field_pair_label(first: &str, second: &str) -> String {
    format!("{first}__{second}")
}

fn category_index<T: Ord>(values: &[T]) -> BTreeMap<&T, usize> {
    let mut index = BTreeMap::new();
    for value in values {
        let next = index.len();
        index.entry(value).or_insert(next);
    }
    index
}

/// Pearson chi-square statistic of a contingency table, with Yates'
/// continuity correction for tables with one degree of freedom
fn chi_square(observed: &[Vec<f64>], n: f64) -> f64 {
    let r = observed.len();
    let k = observed.first().map(Vec::len).unwrap_or(0);
    let dof = (r.saturating_sub(1)) * (k.saturating_sub(1));
    if dof == 0 {
        return 0.0;
    }

    let row_sums: Vec<f64> = observed.iter().map(|row| row.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..k)
        .map(|j| observed.iter().map(|row| row[j]).sum())
        .collect();

    let mut chi2 = 0.0;
    for (i, row) in observed.iter().enumerate() {
        for (j, &obs) in row.iter().enumerate() {
            let expected = row_sums[i] * col_sums[j] / n;
            let mut obs = obs;
            if dof == 1 {
                let diff = expected - obs;
                obs += diff.signum() * diff.abs().min(0.5);
            }
            chi2 += (obs - expected).powi(2) / expected;
        }
    }
    chi2
}
