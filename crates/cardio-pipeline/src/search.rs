//! Hyperparameter search stage.
//!
//! Runs the full grid for both model families under one shared set of
//! stratified folds and logs the winning configuration per family to the
//! experiment store: hyperparameters, cross-validated metrics, and the
//! fitted pipeline. Artifact export is left to the `finalize` stage.

use crate::dataset;
use cardio_core::{ExperimentStore, PipelineConfig, Result, RunRecord};
use cardio_model::{
    forest_grid, grid_search, logistic_grid, GridSearchOutcome, ModelParams, StratifiedKFold,
    TrainedArtifact,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Run the search stage.
pub async fn run(config: &PipelineConfig, store: &dyn ExperimentStore) -> Result<()> {
    let dataset = dataset::load_dataset(Path::new(&config.data_path))?;
    info!(
        samples = dataset.len(),
        positives = dataset.labels.iter().filter(|&&l| l == 1).count(),
        "Loaded cleaned dataset"
    );

    let folds = StratifiedKFold::new(config.n_splits, config.seed).split(&dataset.labels)?;

    let families: [(&str, Vec<ModelParams>); 2] = [
        ("logistic_regression", logistic_grid()),
        ("random_forest", forest_grid(config.seed)),
    ];

    for (family, grid) in families {
        info!(family, combinations = grid.len(), folds = folds.len(), "Running grid search");
        let outcome = grid_search(dataset.features.view(), &dataset.labels, &folds, &grid)?;
        info!(
            family,
            roc_auc = outcome.cv.roc_auc,
            accuracy = outcome.cv.accuracy,
            precision = outcome.cv.precision,
            recall = outcome.cv.recall,
            "Best configuration"
        );

        let record = run_record(&config.search.experiment, family, &outcome)?;
        store.log_run(&record).await?;
        info!(family, run_id = %record.run_id, "Logged search run");
    }

    Ok(())
}

/// Build the run record for one family's winning configuration.
fn run_record(experiment: &str, family: &str, outcome: &GridSearchOutcome) -> Result<RunRecord> {
    let artifact = TrainedArtifact::new(outcome.pipeline.clone(), outcome.params.to_map());

    let mut metrics = BTreeMap::new();
    metrics.insert("accuracy".to_string(), outcome.cv.accuracy);
    metrics.insert("precision".to_string(), outcome.cv.precision);
    metrics.insert("recall".to_string(), outcome.cv.recall);
    metrics.insert("roc_auc".to_string(), outcome.cv.roc_auc);

    Ok(RunRecord::new(experiment, family)
        .with_params(outcome.params.to_map())
        .with_metrics(metrics)
        .with_artifact(artifact.to_json()?))
}
