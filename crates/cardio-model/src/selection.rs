//! Stratified k-fold cross-validation and exhaustive grid search.
//!
//! Fold assignment shuffles each class independently with a seeded
//! ChaCha8 stream and deals the shuffled indices into folds, so class
//! ratios are preserved per fold and the assignment is reproducible from
//! the seed alone.

use crate::metrics::EvalMetrics;
use crate::pipeline::{ModelParams, ModelPipeline};
use crate::{LogisticRegressionParams, Penalty, RandomForestParams};
use cardio_core::{CardioError, Result};
use ndarray::{ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Train/test index pair for one fold.
#[derive(Debug, Clone)]
pub struct FoldIndices {
    /// Row indices used for fitting.
    pub train: Vec<usize>,
    /// Row indices held out for scoring.
    pub test: Vec<usize>,
}

/// Stratified k-fold splitter with shuffling.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    /// Number of folds.
    pub n_splits: usize,
    /// Shuffle seed.
    pub seed: u64,
}

impl StratifiedKFold {
    /// Create a splitter.
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Assign every sample to exactly one test fold, preserving class
    /// ratios.
    ///
    /// Fails if there are fewer than two folds or any class has fewer
    /// samples than folds.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<FoldIndices>> {
        if self.n_splits < 2 {
            return Err(CardioError::Model(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (i, &label) in labels.iter().enumerate() {
            by_class[usize::from(label == 1)].push(i);
        }

        for class in &by_class {
            if class.len() < self.n_splits {
                return Err(CardioError::Model(format!(
                    "a class has {} samples, fewer than {} folds",
                    class.len(),
                    self.n_splits
                )));
            }
        }

        let mut test_folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for class in &mut by_class {
            class.shuffle(&mut rng);
            // Deal the shuffled class into folds: the first `len % k`
            // folds take one extra sample.
            let base = class.len() / self.n_splits;
            let extra = class.len() % self.n_splits;
            let mut offset = 0;
            for (fold, test) in test_folds.iter_mut().enumerate() {
                let take = base + usize::from(fold < extra);
                test.extend_from_slice(&class[offset..offset + take]);
                offset += take;
            }
        }

        let folds = test_folds
            .into_iter()
            .map(|mut test| {
                test.sort_unstable();
                let mut in_test = vec![false; labels.len()];
                for &i in &test {
                    in_test[i] = true;
                }
                let train = (0..labels.len()).filter(|&i| !in_test[i]).collect();
                FoldIndices { train, test }
            })
            .collect();

        Ok(folds)
    }
}

// ---------------------------------------------------------------------------
// Cross-validation
// ---------------------------------------------------------------------------

/// Mean metrics across folds for one candidate configuration.
#[derive(Debug, Clone, Copy)]
pub struct CvScores {
    /// Mean accuracy.
    pub accuracy: f64,
    /// Mean precision.
    pub precision: f64,
    /// Mean recall.
    pub recall: f64,
    /// Mean area under the ROC curve.
    pub roc_auc: f64,
}

impl CvScores {
    fn mean_of(per_fold: &[EvalMetrics]) -> Self {
        let n = per_fold.len() as f64;
        let sum = |f: fn(&EvalMetrics) -> f64| per_fold.iter().map(f).sum::<f64>() / n;
        Self {
            accuracy: sum(|m| m.accuracy),
            precision: sum(|m| m.precision),
            recall: sum(|m| m.recall),
            roc_auc: sum(|m| m.roc_auc),
        }
    }
}

impl std::fmt::Display for CvScores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "acc={:.4} prec={:.4} rec={:.4} auc={:.4}",
            self.accuracy, self.precision, self.recall, self.roc_auc
        )
    }
}

/// Fit and score one candidate configuration across the given folds.
///
/// Each fold fits a fresh pipeline (preprocessor statistics included) on
/// the fold's training rows only, then scores the held-out rows.
pub fn cross_validate(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    folds: &[FoldIndices],
    params: &ModelParams,
) -> Result<CvScores> {
    if folds.is_empty() {
        return Err(CardioError::Model("no folds to cross-validate".to_string()));
    }

    let mut per_fold = Vec::with_capacity(folds.len());
    for fold in folds {
        let x_train = x.select(Axis(0), &fold.train);
        let y_train: Vec<u8> = fold.train.iter().map(|&i| y[i]).collect();
        let x_test = x.select(Axis(0), &fold.test);
        let y_test: Vec<u8> = fold.test.iter().map(|&i| y[i]).collect();

        let pipeline = ModelPipeline::fit(x_train.view(), &y_train, params)?;
        let scores = pipeline.predict_proba(x_test.view())?;
        per_fold.push(EvalMetrics::from_scores(&y_test, &scores, 0.5));
    }

    Ok(CvScores::mean_of(&per_fold))
}

// ---------------------------------------------------------------------------
// Grid search
// ---------------------------------------------------------------------------

/// Outcome of an exhaustive grid search over one family.
#[derive(Debug, Clone)]
pub struct GridSearchOutcome {
    /// The winning configuration.
    pub params: ModelParams,
    /// Cross-validated metrics of the winning configuration.
    pub cv: CvScores,
    /// The winning configuration refitted on the full dataset.
    pub pipeline: ModelPipeline,
}

/// Evaluate every configuration in `grid` with the shared folds, pick the
/// best mean ROC-AUC, and refit it on the full dataset.
pub fn grid_search(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    folds: &[FoldIndices],
    grid: &[ModelParams],
) -> Result<GridSearchOutcome> {
    if grid.is_empty() {
        return Err(CardioError::Model("empty hyperparameter grid".to_string()));
    }

    let mut best: Option<(usize, CvScores)> = None;
    for (i, params) in grid.iter().enumerate() {
        let cv = cross_validate(x, y, folds, params)?;
        debug!(candidate = i, family = params.family(), %cv, "Scored grid candidate");
        let improves = best.as_ref().map_or(true, |(_, b)| cv.roc_auc > b.roc_auc);
        if improves {
            best = Some((i, cv));
        }
    }

    // The grid is non-empty, so a best candidate always exists.
    let (index, cv) = best.ok_or_else(|| CardioError::Model("grid search found no candidate".to_string()))?;
    let params = grid[index].clone();
    let pipeline = ModelPipeline::fit(x, y, &params)?;

    Ok(GridSearchOutcome { params, cv, pipeline })
}

/// The logistic-regression search grid: `C` × penalty.
pub fn logistic_grid() -> Vec<ModelParams> {
    let mut grid = Vec::new();
    for c in [0.01, 0.1, 1.0, 10.0] {
        for penalty in [Penalty::L1, Penalty::L2] {
            grid.push(ModelParams::LogisticRegression(LogisticRegressionParams {
                c,
                penalty,
                ..LogisticRegressionParams::default()
            }));
        }
    }
    grid
}

/// The random-forest search grid: tree count × depth × split size.
pub fn forest_grid(seed: u64) -> Vec<ModelParams> {
    let mut grid = Vec::new();
    for n_trees in [100, 200] {
        for max_depth in [None, Some(5), Some(10)] {
            for min_samples_split in [2, 5] {
                grid.push(ModelParams::RandomForest(RandomForestParams {
                    n_trees,
                    max_depth,
                    min_samples_split,
                    seed,
                }));
            }
        }
    }
    grid
}
