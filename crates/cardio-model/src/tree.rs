//! CART decision tree with Gini impurity splitting.
//!
//! Used standalone for testing and as the base learner of the random
//! forest. Candidate split features can be restricted to a random subset
//! per node (`max_features`), which is how the forest decorrelates its
//! trees; a plain tree considers every feature.

use cardio_core::{CardioError, Result};
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`DecisionTree`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeParams {
    /// Maximum tree depth (`None` = grow until pure or exhausted).
    pub max_depth: Option<usize>,
    /// Minimum number of samples required to split a node.
    pub min_samples_split: usize,
    /// Number of candidate features sampled per node (`None` = all).
    pub max_features: Option<usize>,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

/// A node of the fitted tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Terminal node carrying the class-1 fraction of its training samples.
    Leaf { probability: f64, samples: usize },
    /// Internal split: rows with `value <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted CART classification tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    /// Fit a tree on the given feature matrix and binary labels.
    ///
    /// The RNG drives per-node feature subsampling only; with
    /// `max_features: None` the fit is fully deterministic regardless of
    /// RNG state.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[u8],
        params: &DecisionTreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
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
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let root = build_node(x, y, &indices, 0, params, rng);
        Ok(Self { root })
    }

    /// Class-1 fraction at the leaf this row falls into.
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { probability, .. } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Number of nodes in the fitted tree.
    pub fn node_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + count(left) + count(right),
            }
        }
        count(&self.root)
    }
}

/// Recursively grow a node over `indices`.
fn build_node(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    indices: &[usize],
    depth: usize,
    params: &DecisionTreeParams,
    rng: &mut ChaCha8Rng,
) -> Node {
    let n = indices.len();
    let positives = indices.iter().filter(|&&i| y[i] == 1).count();
    let probability = positives as f64 / n as f64;

    let depth_exhausted = params.max_depth.is_some_and(|d| depth >= d);
    let pure = positives == 0 || positives == n;
    if pure || n < params.min_samples_split || depth_exhausted {
        return Node::Leaf {
            probability,
            samples: n,
        };
    }

    let candidates = candidate_features(x.ncols(), params.max_features, rng);
    let parent_gini = gini(positives, n);

    let mut best: Option<(usize, f64, f64)> = None;
    for feature in candidates {
        if let Some((threshold, score)) = best_split_for_feature(x, y, indices, feature) {
            let improves = best.map_or(true, |(_, _, s)| score < s);
            if improves {
                best = Some((feature, threshold, score));
            }
        }
    }

    match best {
        Some((feature, threshold, score)) if score < parent_gini - 1e-12 => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| x[[i, feature]] <= threshold);
            let left = build_node(x, y, &left_idx, depth + 1, params, rng);
            let right = build_node(x, y, &right_idx, depth + 1, params, rng);
            Node::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => Node::Leaf {
            probability,
            samples: n,
        },
    }
}

/// Pick the candidate feature set for one node.
fn candidate_features(
    n_features: usize,
    max_features: Option<usize>,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    match max_features {
        Some(k) if k < n_features => sample(rng, n_features, k).into_vec(),
        _ => (0..n_features).collect(),
    }
}

/// Best threshold for one feature: midpoints between consecutive distinct
/// sorted values, scored by weighted child Gini impurity.
fn best_split_for_feature(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    indices: &[usize],
    feature: usize,
) -> Option<(f64, f64)> {
    let n = indices.len();
    let mut values: Vec<(f64, u8)> = indices.iter().map(|&i| (x[[i, feature]], y[i])).collect();
    values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let total_pos = values.iter().filter(|(_, l)| *l == 1).count();

    let mut best: Option<(f64, f64)> = None;
    let mut left_n = 0_usize;
    let mut left_pos = 0_usize;
    for i in 0..n - 1 {
        left_n += 1;
        if values[i].1 == 1 {
            left_pos += 1;
        }
        // Only between distinct values is a threshold meaningful.
        if values[i].0 == values[i + 1].0 {
            continue;
        }
        let right_n = n - left_n;
        let right_pos = total_pos - left_pos;
        let weighted = (left_n as f64 * gini(left_pos, left_n)
            + right_n as f64 * gini(right_pos, right_n))
            / n as f64;
        let threshold = (values[i].0 + values[i + 1].0) / 2.0;
        let improves = best.map_or(true, |(_, s)| weighted < s);
        if improves {
            best = Some((threshold, weighted));
        }
    }
    best
}

/// Gini impurity of a binary node.
fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}
