//! Core types, traits, and errors for cardio
//!
//! This crate contains the foundational pieces shared across all cardio
//! components: the ordered feature schema (the single source of truth for
//! feature-table construction at training time and at inference time),
//! the input record type, experiment-run records, the experiment store
//! interface, and configuration types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Feature schema
// ---------------------------------------------------------------------------

/// The 13 feature columns of the cleaned heart-disease dataset, in the
/// exact order they appear in the CSV and in every feature row built from
/// an incoming request.
///
/// Both the training feature-matrix builder and the inference feature-row
/// builder consume this one definition; the fitted preprocessing transform
/// addresses columns positionally, so the order here is load-bearing.
pub const FEATURE_COLUMNS: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Continuous features, standardized by the preprocessing transform.
pub const NUMERIC_FEATURES: [&str; 6] = ["age", "trestbps", "chol", "thalach", "oldpeak", "ca"];

/// Integer-coded categorical features, passed through unscaled.
pub const CATEGORICAL_FEATURES: [&str; 7] =
    ["sex", "cp", "fbs", "restecg", "exang", "slope", "thal"];

/// Name of the binary target column in the cleaned dataset.
pub const TARGET_COLUMN: &str = "target";

/// Number of feature columns.
pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

/// Position of a feature column within [`FEATURE_COLUMNS`].
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|&c| c == name)
}

/// Positions of the numeric features within [`FEATURE_COLUMNS`].
pub fn numeric_indices() -> Vec<usize> {
    NUMERIC_FEATURES
        .iter()
        .filter_map(|name| column_index(name))
        .collect()
}

/// Positions of the categorical features within [`FEATURE_COLUMNS`].
pub fn categorical_indices() -> Vec<usize> {
    CATEGORICAL_FEATURES
        .iter()
        .filter_map(|name| column_index(name))
        .collect()
}

// ---------------------------------------------------------------------------
// Input record
// ---------------------------------------------------------------------------

/// One sample of the 13-field heart-disease feature schema.
///
/// All fields are required. Every field is an integer except `oldpeak`
/// (ST depression, the only continuous non-integer measurement). Unknown
/// fields are rejected so a misspelled field name surfaces as a
/// validation error instead of silently dropping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureRecord {
    /// Age in years.
    pub age: i64,
    /// Sex (0 = female, 1 = male).
    pub sex: i64,
    /// Chest pain type (0-3).
    pub cp: i64,
    /// Resting blood pressure (mm Hg).
    pub trestbps: i64,
    /// Serum cholesterol (mg/dl).
    pub chol: i64,
    /// Fasting blood sugar > 120 mg/dl (0/1).
    pub fbs: i64,
    /// Resting electrocardiographic result (0-2).
    pub restecg: i64,
    /// Maximum heart rate achieved.
    pub thalach: i64,
    /// Exercise-induced angina (0/1).
    pub exang: i64,
    /// ST depression induced by exercise relative to rest.
    pub oldpeak: f64,
    /// Slope of the peak exercise ST segment (0-2).
    pub slope: i64,
    /// Number of major vessels colored by fluoroscopy (0-3).
    pub ca: i64,
    /// Thalassemia code (1-3).
    pub thal: i64,
}

impl FeatureRecord {
    /// Build the feature row for this record, ordered exactly as
    /// [`FEATURE_COLUMNS`].
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age as f64,
            self.sex as f64,
            self.cp as f64,
            self.trestbps as f64,
            self.chol as f64,
            self.fbs as f64,
            self.restecg as f64,
            self.thalach as f64,
            self.exang as f64,
            self.oldpeak,
            self.slope as f64,
            self.ca as f64,
            self.thal as f64,
        ]
    }
}

// ---------------------------------------------------------------------------
// Experiment run types
// ---------------------------------------------------------------------------

/// A single recorded training attempt: the hyperparameters used, the
/// aggregate cross-validated metrics, and the serialized fitted pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier for this run.
    pub run_id: Uuid,
    /// Experiment this run belongs to.
    pub experiment: String,
    /// Human-readable run name (e.g. `"random_forest"`).
    pub run_name: String,
    /// When the run was recorded.
    pub created_at: DateTime<Utc>,
    /// Hyperparameters, stringified for storage.
    pub params: BTreeMap<String, String>,
    /// Aggregate metrics (mean over cross-validation folds).
    pub metrics: BTreeMap<String, f64>,
    /// The serialized trained artifact (JSON), if one was logged.
    pub artifact: Option<String>,
}

impl RunRecord {
    /// Create a new run record stamped with the current time.
    pub fn new(experiment: impl Into<String>, run_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            experiment: experiment.into(),
            run_name: run_name.into(),
            created_at: Utc::now(),
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifact: None,
        }
    }

    /// Attach hyperparameters.
    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Attach aggregate metrics.
    pub fn with_metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Attach the serialized trained artifact.
    pub fn with_artifact(mut self, artifact: String) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

// ---------------------------------------------------------------------------
// Experiment store trait
// ---------------------------------------------------------------------------

/// Store for experiment runs.
///
/// Implementations must retrieve a run's parameters and metrics by run
/// identifier, and the most recent run for a named experiment by
/// timestamp ordering.
#[async_trait::async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Persist a run record.
    async fn log_run(&self, run: &RunRecord) -> Result<()>;

    /// Fetch a run by its identifier.
    async fn get_run(&self, run_id: Uuid) -> Result<Option<RunRecord>>;

    /// Fetch the most recent run for a named experiment.
    ///
    /// An experiment with no recorded runs is an explicit
    /// [`CardioError::ExperimentNotFound`], not an empty result.
    async fn latest_run(&self, experiment: &str) -> Result<RunRecord>;

    /// List all runs for a named experiment, newest first.
    async fn list_runs(&self, experiment: &str) -> Result<Vec<RunRecord>>;

    /// Health check for the store.
    async fn health_check(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Environment variable overriding the experiment-tracking URI.
pub const TRACKING_URI_ENV: &str = "CARDIO_TRACKING_URI";

/// Experiment-tracking store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// SQLite URI for the run store (e.g. `sqlite:cardio_runs.db`).
    #[serde(default = "default_tracking_uri")]
    pub uri: String,
}

fn default_tracking_uri() -> String {
    "sqlite:cardio_runs.db".to_string()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: default_tracking_uri(),
        }
    }
}

impl TrackingConfig {
    /// Resolve the effective tracking URI.
    ///
    /// The [`TRACKING_URI_ENV`] environment variable, when set and
    /// non-empty, overrides the configured value. Read once at process
    /// start by the training binaries.
    pub fn resolve_uri(&self) -> String {
        std::env::var(TRACKING_URI_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.uri.clone())
    }
}

/// Configuration for the `download` pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Source URL for the raw Cleveland dataset.
    #[serde(default = "default_source_url")]
    pub source_url: String,
}

fn default_source_url() -> String {
    "https://archive.ics.uci.edu/ml/machine-learning-databases/heart-disease/processed.cleveland.data"
        .to_string()
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
        }
    }
}

/// Configuration for the `search` pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Experiment name the search runs are logged under.
    #[serde(default = "default_search_experiment")]
    pub experiment: String,
}

fn default_search_experiment() -> String {
    "heart-disease-search".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            experiment: default_search_experiment(),
        }
    }
}

/// Configuration for the `finalize` pipeline stage.
///
/// The hyperparameters here are the documented manual hand-off from the
/// search stage: the winning random-forest configuration is copied in as
/// literal defaults rather than wired automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeConfig {
    /// Experiment name the final run is logged under.
    #[serde(default = "default_final_experiment")]
    pub experiment: String,
    /// Number of trees in the final forest.
    #[serde(default = "default_final_n_trees")]
    pub n_trees: usize,
    /// Maximum tree depth (`None` = unbounded).
    #[serde(default = "default_final_max_depth")]
    pub max_depth: Option<usize>,
    /// Minimum number of samples required to split a node.
    #[serde(default = "default_final_min_samples_split")]
    pub min_samples_split: usize,
    /// Path the exported artifact is written to.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,
}

fn default_final_experiment() -> String {
    "heart-disease-final".to_string()
}

fn default_final_n_trees() -> usize {
    200
}

fn default_final_max_depth() -> Option<usize> {
    Some(10)
}

fn default_final_min_samples_split() -> usize {
    2
}

fn default_artifact_path() -> String {
    "models/artifacts/random_forest_final.json".to_string()
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            experiment: default_final_experiment(),
            n_trees: default_final_n_trees(),
            max_depth: default_final_max_depth(),
            min_samples_split: default_final_min_samples_split(),
            artifact_path: default_artifact_path(),
        }
    }
}

/// Configuration for the offline training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Path of the cleaned training CSV.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Random seed for fold assignment and tree randomness.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of cross-validation folds.
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,
    /// Experiment-tracking store settings.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Download stage settings.
    #[serde(default)]
    pub download: DownloadConfig,
    /// Search stage settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Finalize stage settings.
    #[serde(default)]
    pub finalize: FinalizeConfig,
}

fn default_data_path() -> String {
    "data/processed/heart_disease_clean.csv".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_n_splits() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            seed: default_seed(),
            n_splits: default_n_splits(),
            tracking: TrackingConfig::default(),
            download: DownloadConfig::default(),
            search: SearchConfig::default(),
            finalize: FinalizeConfig::default(),
        }
    }
}

/// Configuration for the inference service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Address and port to bind the service to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Path of the trained artifact loaded at startup.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            artifact_path: default_artifact_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum CardioError {
    /// Dataset loading or validation error.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Model fitting or prediction error.
    #[error("Model error: {0}")]
    Model(String),

    /// Experiment-tracking store error.
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Artifact persistence or loading error.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// The persisted artifact was produced under a different feature
    /// schema than this build compiles against.
    #[error("Artifact schema version mismatch: artifact has version {found}, expected {expected}")]
    SchemaVersionMismatch {
        /// Version this build expects.
        expected: u32,
        /// Version found in the artifact.
        found: u32,
    },

    /// The named experiment has no recorded runs.
    #[error("Experiment not found: {experiment}")]
    ExperimentNotFound {
        /// The experiment that was looked up.
        experiment: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, CardioError>`.
pub type Result<T> = std::result::Result<T, CardioError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_partitions_into_numeric_and_categorical() {
        assert_eq!(NUMERIC_FEATURES.len() + CATEGORICAL_FEATURES.len(), FEATURE_COUNT);
        for name in NUMERIC_FEATURES {
            assert!(column_index(name).is_some(), "unknown numeric column {name}");
            assert!(!CATEGORICAL_FEATURES.contains(&name));
        }
        for name in CATEGORICAL_FEATURES {
            assert!(column_index(name).is_some(), "unknown categorical column {name}");
        }
    }

    #[test]
    fn numeric_indices_match_schema_positions() {
        let idx = numeric_indices();
        assert_eq!(idx.len(), NUMERIC_FEATURES.len());
        for (pos, name) in idx.iter().zip(NUMERIC_FEATURES.iter()) {
            assert_eq!(FEATURE_COLUMNS[*pos], *name);
        }
    }

    fn sample_record() -> FeatureRecord {
        FeatureRecord {
            age: 55,
            sex: 1,
            cp: 2,
            trestbps: 130,
            chol: 250,
            fbs: 0,
            restecg: 1,
            thalach: 150,
            exang: 0,
            oldpeak: 1.5,
            slope: 1,
            ca: 0,
            thal: 2,
        }
    }

    #[test]
    fn feature_row_follows_schema_order() {
        // Cross-check the hand-ordered row against a by-name lookup so the
        // two can never drift apart silently.
        let record = sample_record();
        let row = record.to_row();
        let as_json = serde_json::to_value(&record).unwrap();
        for (i, name) in FEATURE_COLUMNS.iter().enumerate() {
            let expected = as_json[name].as_f64().unwrap();
            assert_eq!(row[i], expected, "column {name} out of order");
        }
    }

    #[test]
    fn record_rejects_unknown_fields() {
        let mut value = serde_json::to_value(sample_record()).unwrap();
        value["extra"] = serde_json::json!(1);
        let parsed: std::result::Result<FeatureRecord, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }

    #[test]
    fn record_rejects_float_in_integer_field() {
        let raw = r#"{"age": 55.5, "sex": 1, "cp": 2, "trestbps": 130, "chol": 250,
                      "fbs": 0, "restecg": 1, "thalach": 150, "exang": 0,
                      "oldpeak": 1.5, "slope": 1, "ca": 0, "thal": 2}"#;
        let parsed: std::result::Result<FeatureRecord, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn record_accepts_integer_oldpeak() {
        let raw = r#"{"age": 55, "sex": 1, "cp": 2, "trestbps": 130, "chol": 250,
                      "fbs": 0, "restecg": 1, "thalach": 150, "exang": 0,
                      "oldpeak": 1, "slope": 1, "ca": 0, "thal": 2}"#;
        let parsed: FeatureRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.oldpeak, 1.0);
    }

    #[test]
    fn run_record_builder() {
        let mut metrics = BTreeMap::new();
        metrics.insert("roc_auc".to_string(), 0.91);
        let run = RunRecord::new("exp", "rf").with_metrics(metrics.clone());
        assert_eq!(run.experiment, "exp");
        assert_eq!(run.metrics, metrics);
        assert!(run.artifact.is_none());
    }

    #[test]
    fn tracking_uri_env_override() {
        let config = TrackingConfig {
            uri: "sqlite:from_config.db".to_string(),
        };
        // Only exercise the fallback path here; the env path would race
        // with other tests mutating the process environment.
        if std::env::var(TRACKING_URI_ENV).is_err() {
            assert_eq!(config.resolve_uri(), "sqlite:from_config.db");
        }
    }

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.n_splits, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.finalize.n_trees, 200);
        assert_eq!(config.finalize.max_depth, Some(10));
        assert_eq!(config.finalize.min_samples_split, 2);
    }

    #[test]
    fn serve_config_serde_roundtrip() {
        let config = ServeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ServeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.listen_addr, config.listen_addr);
        assert_eq!(back.artifact_path, config.artifact_path);
    }
}
