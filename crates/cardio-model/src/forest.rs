//! Random-forest classifier: bagged CART trees with per-node feature
//! subsampling.
//!
//! Every tree draws its bootstrap sample and its feature subsets from a
//! ChaCha8 stream seeded from the configured seed plus the tree index, so
//! a fixed seed reproduces the exact same forest on the same data.

use crate::tree::{DecisionTree, DecisionTreeParams};
use cardio_core::{CardioError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`RandomForestClassifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestParams {
    /// Number of trees.
    pub n_trees: usize,
    /// Maximum depth per tree (`None` = unbounded).
    pub max_depth: Option<usize>,
    /// Minimum number of samples required to split a node.
    pub min_samples_split: usize,
    /// Seed for bootstrap and feature sampling.
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// A fitted random-forest classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    /// Fit the forest on a feature matrix and binary labels.
    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8], params: &RandomForestParams) -> Result<Self> {
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
        if params.n_trees == 0 {
            return Err(CardioError::Model("n_trees must be at least 1".to_string()));
        }

        let n = x.nrows();
        // sqrt(p) feature subsampling, the usual forest default.
        let max_features = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
        let tree_params = DecisionTreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: Some(max_features),
        };

        let mut trees = Vec::with_capacity(params.n_trees);
        for tree_index in 0..params.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(tree_index as u64));
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let bx = x.select(Axis(0), &indices);
            let by: Vec<u8> = indices.iter().map(|&i| y[i]).collect();
            trees.push(DecisionTree::fit(bx.view(), &by, &tree_params, &mut rng)?);
        }

        Ok(Self { trees })
    }

    /// Class-1 probability for one row: the mean of the per-tree leaf
    /// class fractions.
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_proba_row(row)).sum();
        total / self.trees.len() as f64
    }

    /// Class-1 probability for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        Ok(x.rows().into_iter().map(|row| self.predict_proba_row(row)).collect())
    }

    /// Predicted class label for each row (probability threshold 0.5).
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect())
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
