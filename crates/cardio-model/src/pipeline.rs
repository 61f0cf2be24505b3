//! The fitted preprocessing+classifier pipeline and its persisted,
//! versioned artifact.
//!
//! The artifact is the only thing the serving process loads: a JSON
//! bundle of the frozen per-column statistics, the fitted classifier, and
//! the feature-column list it was trained against. Loading verifies both
//! the schema version and the column list, so a stale artifact fails fast
//! instead of silently mis-addressing columns.

use crate::forest::{RandomForestClassifier, RandomForestParams};
use crate::logistic::{LogisticRegression, LogisticRegressionParams};
use crate::preprocess::ColumnPreprocessor;
use cardio_core::{CardioError, Result, FEATURE_COLUMNS, FEATURE_COUNT};
use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version tag written into every artifact.
///
/// Bump whenever the feature schema or the serialized model layout
/// changes; the loader rejects artifacts from other versions.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Candidate hyperparameters
// ---------------------------------------------------------------------------

/// Hyperparameters for one candidate configuration of either family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelParams {
    /// Penalized logistic regression.
    LogisticRegression(LogisticRegressionParams),
    /// Seeded random forest.
    RandomForest(RandomForestParams),
}

impl ModelParams {
    /// Short family name for run labels.
    pub fn family(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::RandomForest(_) => "random_forest",
        }
    }

    /// Stringified hyperparameters for run records.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("family".to_string(), self.family().to_string());
        match self {
            Self::LogisticRegression(p) => {
                map.insert("C".to_string(), format!("{}", p.c));
                map.insert("penalty".to_string(), p.penalty.to_string());
                map.insert("max_iter".to_string(), p.max_iter.to_string());
            }
            Self::RandomForest(p) => {
                map.insert("n_trees".to_string(), p.n_trees.to_string());
                map.insert(
                    "max_depth".to_string(),
                    p.max_depth.map_or_else(|| "none".to_string(), |d| d.to_string()),
                );
                map.insert("min_samples_split".to_string(), p.min_samples_split.to_string());
                map.insert("seed".to_string(), p.seed.to_string());
            }
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Fitted pipeline
// ---------------------------------------------------------------------------

/// A fitted classifier of either family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Classifier {
    /// Fitted logistic regression.
    LogisticRegression(LogisticRegression),
    /// Fitted random forest.
    RandomForest(RandomForestClassifier),
}

/// Fitted preprocessing transform + fitted classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPipeline {
    /// Frozen column preprocessor.
    pub preprocessor: ColumnPreprocessor,
    /// Frozen classifier.
    pub classifier: Classifier,
}

impl ModelPipeline {
    /// Fit the preprocessor on `x`, then fit the classifier described by
    /// `params` on the transformed matrix.
    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8], params: &ModelParams) -> Result<Self> {
        let preprocessor = ColumnPreprocessor::fit(x)?;
        let transformed = preprocessor.transform(x)?;
        let classifier = match params {
            ModelParams::LogisticRegression(p) => {
                Classifier::LogisticRegression(LogisticRegression::fit(transformed.view(), y, p)?)
            }
            ModelParams::RandomForest(p) => {
                Classifier::RandomForest(RandomForestClassifier::fit(transformed.view(), y, p)?)
            }
        };
        Ok(Self {
            preprocessor,
            classifier,
        })
    }

    /// Class-1 probability for each row of an untransformed feature matrix.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let transformed = self.preprocessor.transform(x)?;
        match &self.classifier {
            Classifier::LogisticRegression(m) => m.predict_proba(&transformed),
            Classifier::RandomForest(m) => m.predict_proba(&transformed),
        }
    }

    /// Predicted class label for each row (probability threshold 0.5).
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect())
    }

    /// Predict a single feature row; returns `(label, class-1 probability)`.
    pub fn predict_one(&self, row: &[f64; FEATURE_COUNT]) -> Result<(u8, f64)> {
        let x = Array2::from_shape_vec((1, FEATURE_COUNT), row.to_vec())
            .map_err(|e| CardioError::Model(format!("failed to shape feature row: {e}")))?;
        let probability = self.predict_proba(x.view())?[0];
        Ok((u8::from(probability >= 0.5), probability))
    }
}

// ---------------------------------------------------------------------------
// Persisted artifact
// ---------------------------------------------------------------------------

/// The immutable, persisted preprocessing+classifier bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    /// Artifact layout version; checked at load time.
    pub schema_version: u32,
    /// Feature columns the pipeline was trained against, in order.
    pub feature_columns: Vec<String>,
    /// When the artifact was produced.
    pub trained_at: DateTime<Utc>,
    /// Hyperparameters of the fitted classifier.
    pub params: BTreeMap<String, String>,
    /// The fitted pipeline.
    pub pipeline: ModelPipeline,
}

impl TrainedArtifact {
    /// Wrap a fitted pipeline into a versioned artifact.
    pub fn new(pipeline: ModelPipeline, params: BTreeMap<String, String>) -> Self {
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            feature_columns: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            trained_at: Utc::now(),
            params,
            pipeline,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON and verify the schema version and column list.
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.verify_schema()?;
        Ok(artifact)
    }

    /// Write the artifact to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CardioError::Artifact(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| CardioError::Artifact(format!("failed to write {}: {e}", path.display())))
    }

    /// Load and verify an artifact from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CardioError::Artifact(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Check the artifact against the compiled-in feature schema.
    fn verify_schema(&self) -> Result<()> {
        if self.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(CardioError::SchemaVersionMismatch {
                expected: ARTIFACT_SCHEMA_VERSION,
                found: self.schema_version,
            });
        }
        let expected: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
        if self.feature_columns != expected {
            return Err(CardioError::Artifact(format!(
                "artifact feature columns {:?} do not match this build's schema",
                self.feature_columns
            )));
        }
        Ok(())
    }
}

/// Round a probability to 4 decimal places, the precision of the serving
/// contract.
pub fn round_probability(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}
