//! Column preprocessing: standardize numeric features, pass categoricals
//! through.
//!
//! The transform learns per-numeric-column mean and standard deviation
//! once, at fit time, and is frozen thereafter. Output columns are ordered
//! numeric-then-categorical; the same ordering is applied at fit time and
//! at transform time, so positional column addressing downstream stays
//! consistent.

use cardio_core::{numeric_indices, CardioError, Result, FEATURE_COUNT};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted preprocessing transform over the 13-column feature matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    /// Schema positions of the numeric columns, in numeric-block order.
    numeric_idx: Vec<usize>,
    /// Schema positions of the categorical columns, in passthrough order.
    categorical_idx: Vec<usize>,
    /// Per-numeric-column mean learned from the training data.
    means: Vec<f64>,
    /// Per-numeric-column scale (standard deviation) learned from the
    /// training data. A constant column gets scale 1.0 so it maps to zero
    /// instead of dividing by zero.
    scales: Vec<f64>,
}

impl ColumnPreprocessor {
    /// Learn the standardization statistics from a training feature matrix.
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self> {
        check_shape(x)?;
        let numeric_idx = numeric_indices();
        let categorical_idx = cardio_core::categorical_indices();

        let mut means = Vec::with_capacity(numeric_idx.len());
        let mut scales = Vec::with_capacity(numeric_idx.len());
        for &col in &numeric_idx {
            let column = x.index_axis(Axis(1), col);
            let mean = column.mean().unwrap_or(0.0);
            let std = column.std(0.0);
            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(Self {
            numeric_idx,
            categorical_idx,
            means,
            scales,
        })
    }

    /// Apply the frozen transform.
    ///
    /// Returns a matrix with the numeric block standardized and the
    /// categorical block unchanged, columns ordered
    /// numeric-then-categorical.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        check_shape(x)?;
        let nrows = x.nrows();
        let ncols = self.numeric_idx.len() + self.categorical_idx.len();
        let mut out = Array2::<f64>::zeros((nrows, ncols));

        for (j, &col) in self.numeric_idx.iter().enumerate() {
            let mean = self.means[j];
            let scale = self.scales[j];
            for i in 0..nrows {
                out[[i, j]] = (x[[i, col]] - mean) / scale;
            }
        }
        let offset = self.numeric_idx.len();
        for (j, &col) in self.categorical_idx.iter().enumerate() {
            for i in 0..nrows {
                out[[i, offset + j]] = x[[i, col]];
            }
        }

        Ok(out)
    }

    /// Number of numeric columns in the transformed output.
    pub fn numeric_width(&self) -> usize {
        self.numeric_idx.len()
    }
}

/// Reject matrices that do not match the 13-column schema or contain
/// non-finite values.
fn check_shape(x: ArrayView2<'_, f64>) -> Result<()> {
    if x.ncols() != FEATURE_COUNT {
        return Err(CardioError::Model(format!(
            "expected {} feature columns, got {}",
            FEATURE_COUNT,
            x.ncols()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(CardioError::Model(
            "feature matrix contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
