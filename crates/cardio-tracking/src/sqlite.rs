//! SQLite-backed experiment store.
//!
//! One `runs` table holds every recorded training attempt; parameters and
//! metrics are stored as JSON TEXT columns, the serialized artifact as a
//! nullable TEXT column. Timestamps are RFC 3339 strings, so the
//! latest-run lookup can order on them lexicographically.

use async_trait::async_trait;
use cardio_core::{CardioError, ExperimentStore, Result, RunRecord};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Schema migrations
// ---------------------------------------------------------------------------

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS runs (
        run_id TEXT NOT NULL PRIMARY KEY,
        experiment TEXT NOT NULL,
        run_name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        params TEXT NOT NULL DEFAULT '{}',
        metrics TEXT NOT NULL DEFAULT '{}',
        artifact TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_runs_experiment ON runs(experiment, created_at)",
];

/// SQLite-backed [`ExperimentStore`].
pub struct SqliteExperimentStore {
    pool: SqlitePool,
}

impl SqliteExperimentStore {
    /// Open (or create) the store at the given SQLite URI and run
    /// migrations.
    pub async fn connect(uri: &str) -> Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str(uri)
            .map_err(|e| CardioError::Tracking(format!("Invalid tracking URI '{uri}': {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // In-memory databases are per-connection; keep a single
        // connection so every query sees the same database.
        let max_conns: u32 = if uri.contains(":memory:") { 1 } else { 5 };

        let pool = sqlx::pool::PoolOptions::<Sqlite>::new()
            .max_connections(max_conns)
            .connect_with(connect_opts)
            .await
            .map_err(|e| CardioError::Tracking(format!("Failed to connect to SQLite: {e}")))?;

        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| CardioError::Tracking(format!("Migration failed: {e}")))?;
        }

        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Row ↔ RunRecord conversion
// ---------------------------------------------------------------------------

fn run_from_row(row: &SqliteRow) -> Result<RunRecord> {
    let run_id = Uuid::parse_str(&row.get::<String, _>("run_id"))
        .map_err(|e| CardioError::Tracking(format!("Invalid run_id: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CardioError::Tracking(format!("Invalid created_at: {e}")))?;

    let params: BTreeMap<String, String> = {
        let raw: String = row.get("params");
        serde_json::from_str(&raw)
            .map_err(|e| CardioError::Tracking(format!("Invalid params JSON: {e}")))?
    };
    let metrics: BTreeMap<String, f64> = {
        let raw: String = row.get("metrics");
        serde_json::from_str(&raw)
            .map_err(|e| CardioError::Tracking(format!("Invalid metrics JSON: {e}")))?
    };

    Ok(RunRecord {
        run_id,
        experiment: row.get("experiment"),
        run_name: row.get("run_name"),
        created_at,
        params,
        metrics,
        artifact: row.get("artifact"),
    })
}

#[async_trait]
impl ExperimentStore for SqliteExperimentStore {
    async fn log_run(&self, run: &RunRecord) -> Result<()> {
        let params = serde_json::to_string(&run.params)?;
        let metrics = serde_json::to_string(&run.metrics)?;

        sqlx::query(
            "INSERT INTO runs (run_id, experiment, run_name, created_at, params, metrics, artifact)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(run.run_id.to_string())
        .bind(&run.experiment)
        .bind(&run.run_name)
        .bind(run.created_at.to_rfc3339())
        .bind(params)
        .bind(metrics)
        .bind(run.artifact.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| CardioError::Tracking(format!("Failed to insert run: {e}")))?;

        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let row = sqlx::query("SELECT * FROM runs WHERE run_id = ?1")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CardioError::Tracking(format!("Failed to fetch run: {e}")))?;

        row.as_ref().map(run_from_row).transpose()
    }

    async fn latest_run(&self, experiment: &str) -> Result<RunRecord> {
        let row = sqlx::query(
            "SELECT * FROM runs WHERE experiment = ?1
             ORDER BY created_at DESC, run_id LIMIT 1",
        )
        .bind(experiment)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CardioError::Tracking(format!("Failed to fetch latest run: {e}")))?;

        match row {
            Some(row) => run_from_row(&row),
            None => Err(CardioError::ExperimentNotFound {
                experiment: experiment.to_string(),
            }),
        }
    }

    async fn list_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM runs WHERE experiment = ?1 ORDER BY created_at DESC, run_id",
        )
        .bind(experiment)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CardioError::Tracking(format!("Failed to list runs: {e}")))?;

        rows.iter().map(run_from_row).collect()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CardioError::Tracking(format!("Health check failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn memory_store() -> SqliteExperimentStore {
        SqliteExperimentStore::connect("sqlite::memory:").await.unwrap()
    }

    fn run(experiment: &str, name: &str, offset_secs: i64) -> RunRecord {
        let mut run = RunRecord::new(experiment, name);
        run.created_at = Utc::now() + Duration::seconds(offset_secs);
        run.params.insert("n_trees".to_string(), "200".to_string());
        run.metrics.insert("roc_auc".to_string(), 0.9);
        run
    }

    #[tokio::test]
    async fn log_and_get_round_trip() {
        let store = memory_store().await;
        let record = run("exp", "rf", 0).with_artifact("{\"model\":true}".to_string());
        store.log_run(&record).await.unwrap();

        let fetched = store.get_run(record.run_id).await.unwrap().unwrap();
        assert_eq!(fetched.experiment, "exp");
        assert_eq!(fetched.run_name, "rf");
        assert_eq!(fetched.params["n_trees"], "200");
        assert_eq!(fetched.metrics["roc_auc"], 0.9);
        assert_eq!(fetched.artifact.as_deref(), Some("{\"model\":true}"));
    }

    #[tokio::test]
    async fn get_unknown_run_is_none() {
        let store = memory_store().await;
        assert!(store.get_run(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_run_orders_by_timestamp() {
        let store = memory_store().await;
        store.log_run(&run("exp", "older", -60)).await.unwrap();
        store.log_run(&run("exp", "newest", 60)).await.unwrap();
        store.log_run(&run("exp", "middle", 0)).await.unwrap();

        let latest = store.latest_run("exp").await.unwrap();
        assert_eq!(latest.run_name, "newest");
    }

    #[tokio::test]
    async fn missing_experiment_is_an_explicit_error() {
        let store = memory_store().await;
        let err = store.latest_run("nope").await.unwrap_err();
        assert!(matches!(err, CardioError::ExperimentNotFound { .. }));
    }

    #[tokio::test]
    async fn list_runs_filters_by_experiment() {
        let store = memory_store().await;
        store.log_run(&run("a", "one", 0)).await.unwrap();
        store.log_run(&run("a", "two", 10)).await.unwrap();
        store.log_run(&run("b", "other", 0)).await.unwrap();

        let runs = store.list_runs("a").await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_name, "two");
    }

    #[tokio::test]
    async fn persists_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("sqlite:{}", dir.path().join("runs.db").display());

        let record = run("exp", "rf", 0);
        {
            let store = SqliteExperimentStore::connect(&uri).await.unwrap();
            store.log_run(&record).await.unwrap();
        }
        let store = SqliteExperimentStore::connect(&uri).await.unwrap();
        let latest = store.latest_run("exp").await.unwrap();
        assert_eq!(latest.run_id, record.run_id);
    }

    #[tokio::test]
    async fn health_check_passes() {
        let store = memory_store().await;
        store.health_check().await.unwrap();
    }
}
