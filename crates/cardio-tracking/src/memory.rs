//! In-memory experiment store for testing.
//!
//! Runs are held in a `Vec` behind an async `RwLock`; lookups are linear
//! scans. Data is lost when the store is dropped.

use async_trait::async_trait;
use cardio_core::{CardioError, ExperimentStore, Result, RunRecord};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory [`ExperimentStore`].
#[derive(Default)]
pub struct InMemoryExperimentStore {
    runs: RwLock<Vec<RunRecord>>,
}

impl InMemoryExperimentStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExperimentStore for InMemoryExperimentStore {
    async fn log_run(&self, run: &RunRecord) -> Result<()> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let runs = self.runs.read().await;
        Ok(runs.iter().find(|r| r.run_id == run_id).cloned())
    }

    async fn latest_run(&self, experiment: &str) -> Result<RunRecord> {
        let runs = self.runs.read().await;
        runs.iter()
            .filter(|r| r.experiment == experiment)
            .max_by_key(|r| r.created_at)
            .cloned()
            .ok_or_else(|| CardioError::ExperimentNotFound {
                experiment: experiment.to_string(),
            })
    }

    async fn list_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let mut out: Vec<RunRecord> = runs
            .iter()
            .filter(|r| r.experiment == experiment)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
