//! Model layer for cardio
//!
//! Implements the fitted preprocessing transform, the two candidate
//! classifier families (penalized logistic regression and a seeded random
//! forest), the bundled preprocessing+classifier pipeline with its
//! versioned persisted artifact, classification metrics, and stratified
//! cross-validated grid search.

pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod selection;
#[cfg(test)]
mod testdata;
pub mod tree;

pub use forest::{RandomForestClassifier, RandomForestParams};
pub use logistic::{LogisticRegression, LogisticRegressionParams, Penalty};
pub use metrics::{roc_auc_score, ConfusionMatrix, EvalMetrics};
pub use pipeline::{
    round_probability, Classifier, ModelParams, ModelPipeline, TrainedArtifact,
    ARTIFACT_SCHEMA_VERSION,
};
pub use preprocess::ColumnPreprocessor;
pub use selection::{
    cross_validate, forest_grid, grid_search, logistic_grid, CvScores, FoldIndices,
    GridSearchOutcome, StratifiedKFold,
};
pub use tree::{DecisionTree, DecisionTreeParams};
