//! Per-window standardization

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Zero-mean, unit-variance scaling fitted on the current window only
///
/// Columns without variance are mapped to a constant 0.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let n_features = x.ncols();
        if x.nrows() == 0 {
            return Self {
                means: Array1::zeros(n_features),
                scales: Array1::zeros(n_features),
            };
        }

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
        let scales = Array1::from_iter(x.axis_iter(Axis(1)).zip(means.iter()).map(
            |(column, &mean)| {
                let variance =
                    column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
                let std_dev = variance.sqrt();
                if is_degenerate(std_dev, mean) {
                    0.0
                } else {
                    std_dev
                }
            },
        ));

        Self { means, scales }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut scaled = x.to_owned();
        for (mut column, (&mean, &scale)) in scaled
            .axis_iter_mut(Axis(1))
            .zip(self.means.iter().zip(self.scales.iter()))
        {
            if scale == 0.0 {
                column.fill(0.0);
            } else {
                column.mapv_inplace(|v| (v - mean) / scale);
            }
        }
        scaled
    }

    pub fn fit_transform(x: ArrayView2<'_, f64>) -> Array2<f64> {
        Self::fit(x).transform(x)
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }
}

/// A deviation that is rounding noise relative to the mean counts as zero
fn is_degenerate(std_dev: f64, mean: f64) -> bool {
    !std_dev.is_finite() || std_dev <= 10.0 * f64::EPSILON * mean.abs().max(1.0)
}
