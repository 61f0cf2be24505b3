//! Penalized logistic regression fitted by full-batch gradient descent.
//!
//! Supports L1 (soft-thresholded) and L2 penalties with strength `1/C`,
//! matching the inverse-regularization-strength convention of the
//! hyperparameter grid. The intercept is never penalized. Initialization
//! is deterministic (zero weights), so repeated fits on the same data
//! produce identical models.

use cardio_core::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Penalty applied to the weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    /// Lasso penalty; drives small weights exactly to zero.
    L1,
    /// Ridge penalty.
    L2,
}

impl std::fmt::Display for Penalty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::L1 => write!(f, "l1"),
            Self::L2 => write!(f, "l2"),
        }
    }
}

/// Hyperparameters for [`LogisticRegression`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    /// Inverse regularization strength; smaller values regularize harder.
    pub c: f64,
    /// Penalty applied to the weights.
    pub penalty: Penalty,
    /// Maximum number of gradient-descent iterations.
    pub max_iter: usize,
    /// Gradient-descent step size.
    pub learning_rate: f64,
    /// Convergence tolerance on the largest parameter update.
    pub tol: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            penalty: Penalty::L2,
            max_iter: 1000,
            learning_rate: 0.1,
            tol: 1e-6,
        }
    }
}

/// A fitted logistic-regression classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    /// Fit on a feature matrix and binary labels.
    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8], params: &LogisticRegressionParams) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(CardioError::Model(format!(
                "feature rows ({}) and labels ({}) disagree",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(CardioError::Model("cannot fit on an empty dataset".to_string()));
        }
        if params.c <= 0.0 {
            return Err(CardioError::Model(format!("C must be positive, got {}", params.c)));
        }

        let n = x.nrows() as f64;
        let targets: Array1<f64> = y.iter().map(|&v| f64::from(v)).collect();
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut intercept = 0.0_f64;
        // Per-sample penalty strength, mirroring the 1/(C*n) scaling of
        // liblinear-style objectives.
        let strength = 1.0 / (params.c * n);

        for _ in 0..params.max_iter {
            let logits = x.dot(&weights) + intercept;
            let probs = logits.mapv(sigmoid);
            let residuals = &probs - &targets;

            let grad = x.t().dot(&residuals) / n;
            let grad_intercept = residuals.sum() / n;

            let next_weights = match params.penalty {
                Penalty::L2 => {
                    let penalized = &grad + &(&weights * strength);
                    &weights - &(&penalized * params.learning_rate)
                }
                Penalty::L1 => {
                    let stepped = &weights - &(&grad * params.learning_rate);
                    stepped.mapv(|w| soft_threshold(w, params.learning_rate * strength))
                }
            };
            let next_intercept = intercept - params.learning_rate * grad_intercept;

            let delta = (&next_weights - &weights)
                .iter()
                .map(|d| d.abs())
                .fold((next_intercept - intercept).abs(), f64::max);

            weights = next_weights;
            intercept = next_intercept;

            if delta < params.tol {
                break;
            }
        }

        Ok(Self {
            weights: weights.to_vec(),
            intercept,
        })
    }

    /// Decision function for a single feature row.
    fn decision(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.weights
            .iter()
            .zip(row.iter())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }

    /// Estimated probability of class 1 for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.weights.len() {
            return Err(CardioError::Model(format!(
                "expected {} columns, got {}",
                self.weights.len(),
                x.ncols()
            )));
        }
        Ok(x.rows().into_iter().map(|row| sigmoid(self.decision(row))).collect())
    }

    /// Predicted class label for each row (probability threshold 0.5).
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect())
    }

    /// Fitted weight vector.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Fitted intercept.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Numerically safe logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Soft-thresholding operator used by the L1 proximal step.
fn soft_threshold(w: f64, t: f64) -> f64 {
    if w > t {
        w - t
    } else if w < -t {
        w + t
    } else {
        0.0
    }
}
