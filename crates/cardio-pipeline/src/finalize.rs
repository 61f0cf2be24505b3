//! Final-artifact stage.
//!
//! Fits only the shipped random-forest configuration (the hand-off from
//! the search stage, hard-coded in [`FinalizeConfig`]) on the full
//! dataset, re-measures its cross-validated metrics for the run record,
//! logs the run, and exports the versioned artifact to the fixed path the
//! serving process loads from.

use crate::dataset;
use cardio_core::{ExperimentStore, PipelineConfig, Result, RunRecord};
use cardio_model::{
    cross_validate, ModelParams, ModelPipeline, RandomForestParams, StratifiedKFold,
    TrainedArtifact,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Run the finalize stage; returns the exported artifact.
pub async fn run(config: &PipelineConfig, store: &dyn ExperimentStore) -> Result<TrainedArtifact> {
    let dataset = dataset::load_dataset(Path::new(&config.data_path))?;
    info!(samples = dataset.len(), "Loaded cleaned dataset");

    let params = ModelParams::RandomForest(RandomForestParams {
        n_trees: config.finalize.n_trees,
        max_depth: config.finalize.max_depth,
        min_samples_split: config.finalize.min_samples_split,
        seed: config.seed,
    });

    let folds = StratifiedKFold::new(config.n_splits, config.seed).split(&dataset.labels)?;
    let cv = cross_validate(dataset.features.view(), &dataset.labels, &folds, &params)?;
    info!(
        roc_auc = cv.roc_auc,
        accuracy = cv.accuracy,
        precision = cv.precision,
        recall = cv.recall,
        "Cross-validated final configuration"
    );

    let pipeline = ModelPipeline::fit(dataset.features.view(), &dataset.labels, &params)?;
    let artifact = TrainedArtifact::new(pipeline, params.to_map());

    let mut metrics = BTreeMap::new();
    metrics.insert("accuracy".to_string(), cv.accuracy);
    metrics.insert("precision".to_string(), cv.precision);
    metrics.insert("recall".to_string(), cv.recall);
    metrics.insert("roc_auc".to_string(), cv.roc_auc);

    let record = RunRecord::new(&config.finalize.experiment, "random_forest_final")
        .with_params(params.to_map())
        .with_metrics(metrics)
        .with_artifact(artifact.to_json()?);
    store.log_run(&record).await?;
    info!(run_id = %record.run_id, "Logged final run");

    let artifact_path = Path::new(&config.finalize.artifact_path);
    artifact.save(artifact_path)?;
    info!(path = %artifact_path.display(), "Exported trained artifact");

    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::synthetic_csv;
    use cardio_core::FinalizeConfig;
    use cardio_tracking::InMemoryExperimentStore;

    #[tokio::test]
    async fn exports_a_loadable_artifact_and_logs_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = synthetic_csv(dir.path(), 40);
        let artifact_path = dir.path().join("artifacts/final.json");

        let config = PipelineConfig {
            data_path: data_path.display().to_string(),
            finalize: FinalizeConfig {
                n_trees: 20,
                artifact_path: artifact_path.display().to_string(),
                ..FinalizeConfig::default()
            },
            ..PipelineConfig::default()
        };
        let store = InMemoryExperimentStore::new();
        let exported = run(&config, &store).await.unwrap();

        // The flat file round-trips and predicts identically.
        let loaded = TrainedArtifact::load(&artifact_path).unwrap();
        let dataset = dataset::load_dataset(&data_path).unwrap();
        assert_eq!(
            exported.pipeline.predict_proba(dataset.features.view()).unwrap(),
            loaded.pipeline.predict_proba(dataset.features.view()).unwrap()
        );

        // The run is retrievable without the flat file.
        let latest = store.latest_run(&config.finalize.experiment).await.unwrap();
        assert_eq!(latest.run_name, "random_forest_final");
        assert_eq!(latest.params["n_trees"], "20");
        let from_store = TrainedArtifact::from_json(latest.artifact.as_ref().unwrap()).unwrap();
        assert_eq!(
            from_store.pipeline.predict_proba(dataset.features.view()).unwrap(),
            loaded.pipeline.predict_proba(dataset.features.view()).unwrap()
        );
    }

    #[tokio::test]
    async fn finalizing_twice_with_the_same_seed_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = synthetic_csv(dir.path(), 30);

        let mut config = PipelineConfig {
            data_path: data_path.display().to_string(),
            ..PipelineConfig::default()
        };
        config.finalize.n_trees = 15;
        config.finalize.artifact_path = dir.path().join("a.json").display().to_string();

        let store = InMemoryExperimentStore::new();
        let first = run(&config, &store).await.unwrap();
        config.finalize.artifact_path = dir.path().join("b.json").display().to_string();
        let second = run(&config, &store).await.unwrap();

        let dataset = dataset::load_dataset(&data_path).unwrap();
        assert_eq!(
            first.pipeline.predict_proba(dataset.features.view()).unwrap(),
            second.pipeline.predict_proba(dataset.features.view()).unwrap()
        );
    }
}
