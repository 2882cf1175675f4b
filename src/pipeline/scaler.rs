
//! scaler.rs
//! Per-feature min/max scaling into [0, 1], invertible back to original units.
//!
//! One scaler is fitted per node and owned by that node's pipeline run.
//! The instance that transformed the inputs is the only one that may invert
//! the model output: min/max ranges are never shared between nodes.
//!
//! Decisions the source left undefined, fixed here:
//! - degenerate column (max == min): transform maps every value to 0.0 and
//!   inverse maps back to the constant `min` (no NaN, no panic)
//! - values outside the fitted range at inference time pass through the
//!   affine map un-clamped (the output can leave [0, 1])

use ndarray::Array2;

/// Min/max affine scaler, fitted once per node.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Fits per-column min/max over all rows of `matrix`.
    pub fn fit(matrix: &Array2<f64>) -> Self {
        let cols = matrix.ncols();
        let mut mins = vec![f64::INFINITY; cols];
        let mut maxs = vec![f64::NEG_INFINITY; cols];

        for row in matrix.rows() {
            for (c, &v) in row.iter().enumerate() {
                mins[c] = mins[c].min(v);
                maxs[c] = maxs[c].max(v);
            }
        }

        Self { mins, maxs }
    }

    /// Maps each value to `(v - min) / (max - min)`.
    /// Degenerate columns (max == min) map to 0.0.
    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        let mut out = matrix.clone();
        for mut row in out.rows_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                let range = self.maxs[c] - self.mins[c];
                *v = if range == 0.0 {
                    0.0
                } else {
                    (*v - self.mins[c]) / range
                };
            }
        }
        out
    }

    /// Maps each value back via `v * (max - min) + min`.
    /// Degenerate columns invert to the constant `min`.
    pub fn inverse_transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        let mut out = matrix.clone();
        for mut row in out.rows_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                let range = self.maxs[c] - self.mins[c];
                *v = *v * range + self.mins[c];
            }
        }
        out
    }

    /// Convenience: fit on `matrix` and transform it in one call.
    pub fn fit_transform(matrix: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(matrix);
        let scaled = scaler.transform(matrix);
        (scaler, scaled)
    }
}
