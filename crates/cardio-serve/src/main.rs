//! Heart-disease inference service.
//!
//! Loads the trained artifact once at startup and serves synchronous
//! predictions over HTTP:
//!
//! - `GET /` — liveness check
//! - `POST /predict` — classify a 13-field record
//!
//! If the artifact cannot be loaded or fails its schema check, the
//! process exits before binding; there is no partially-ready state.

use cardio_core::ServeConfig;
use cardio_model::TrainedArtifact;
use cardio_serve::{build_router, config, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt::init();

    let config = load_serve_config()?;
    let listen_addr = config.listen_addr.clone();

    // Fail fast: no artifact, no service.
    let artifact = TrainedArtifact::load(Path::new(&config.artifact_path))?;
    info!(
        path = %config.artifact_path,
        schema_version = artifact.schema_version,
        trained_at = %artifact.trained_at,
        "Loaded trained artifact"
    );

    let state = Arc::new(AppState { config, artifact });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(%listen_addr, "Inference service listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load serving configuration from a YAML file or fall back to defaults.
///
/// Checks (in order):
/// 1. First CLI argument as config path
/// 2. `CARDIO_SERVE_CONFIG` environment variable
/// 3. Default configuration
fn load_serve_config() -> anyhow::Result<ServeConfig> {
    let config_path: Option<PathBuf> = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CARDIO_SERVE_CONFIG").ok())
        .map(PathBuf::from);

    match config_path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration from file");
            config::load_config(&path)
        }
        None => {
            info!("No config file specified, using defaults");
            Ok(ServeConfig::default())
        }
    }
}
