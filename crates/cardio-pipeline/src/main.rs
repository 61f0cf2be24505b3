//! Offline training pipeline runner.
//!
//! Three decoupled stages, each a subcommand:
//!
//! - `download` — fetch and clean the raw dataset into the cleaned CSV
//! - `search` — cross-validated grid search over both model families,
//!   logged to the experiment store
//! - `finalize` — fit the shipped configuration and export the serving
//!   artifact
//!
//! Usage:
//!   cargo run --bin cardio-pipeline -- download
//!   cargo run --bin cardio-pipeline -- search
//!   cargo run --bin cardio-pipeline -- --config pipeline.yaml finalize

mod dataset;
mod download;
mod finalize;
mod search;
#[cfg(test)]
mod testutil;

use cardio_core::{ExperimentStore, PipelineConfig};
use cardio_tracking::SqliteExperimentStore;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "cardio-pipeline", about = "Heart-disease training pipeline")]
struct Cli {
    /// Path to a YAML pipeline configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download and clean the raw dataset.
    Download,
    /// Run the cross-validated hyperparameter search for both families.
    Search,
    /// Fit the shipped configuration and export the serving artifact.
    Finalize,
    /// Fetch the most recent final run from the tracking store and run a
    /// sample prediction through its logged artifact.
    PredictLatest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_pipeline_config(cli.config.as_deref())?;

    match cli.command {
        Command::Download => {
            download::run(&config.download, Path::new(&config.data_path)).await?;
        }
        Command::Search => {
            let store = connect_store(&config).await?;
            search::run(&config, store.as_ref()).await?;
        }
        Command::Finalize => {
            let store = connect_store(&config).await?;
            finalize::run(&config, store.as_ref()).await?;
        }
        Command::PredictLatest => {
            let store = connect_store(&config).await?;
            predict_latest(&config, store.as_ref()).await?;
        }
    }

    Ok(())
}

/// Recover the most recent final run from the tracking store (no flat
/// artifact file involved) and classify a sample record with it.
async fn predict_latest(
    config: &PipelineConfig,
    store: &dyn ExperimentStore,
) -> anyhow::Result<()> {
    let run = store.latest_run(&config.finalize.experiment).await?;
    info!(run_id = %run.run_id, run_name = %run.run_name, created_at = %run.created_at, "Latest run");
    for (key, value) in &run.metrics {
        info!(metric = %key, value, "Run metric");
    }

    let artifact_json = run
        .artifact
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("run {} has no logged artifact", run.run_id))?;
    let artifact = cardio_model::TrainedArtifact::from_json(artifact_json)?;

    let sample = cardio_core::FeatureRecord {
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
    };
    let (prediction, probability) = artifact.pipeline.predict_one(&sample.to_row())?;
    info!(prediction, probability, "Sample prediction");
    Ok(())
}

/// Load the pipeline configuration from a YAML file, or fall back to
/// defaults.
fn load_pipeline_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading pipeline configuration");
            let contents = std::fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
            })?;
            let config: PipelineConfig = serde_yaml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
            Ok(config)
        }
        None => {
            info!("No config file specified, using defaults");
            Ok(PipelineConfig::default())
        }
    }
}

/// Connect the experiment store at the resolved tracking URI.
///
/// The `CARDIO_TRACKING_URI` environment variable overrides the
/// configured URI; it is read once, here, at process start.
async fn connect_store(config: &PipelineConfig) -> anyhow::Result<Box<dyn ExperimentStore>> {
    let uri = config.tracking.resolve_uri();
    info!(%uri, "Connecting experiment store");
    let store = SqliteExperimentStore::connect(&uri).await?;
    Ok(Box::new(store))
}
