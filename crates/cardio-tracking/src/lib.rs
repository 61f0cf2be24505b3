//! Experiment-tracking stores for cardio
//!
//! Implementations of [`cardio_core::ExperimentStore`]: a SQLite-backed
//! store for durable training runs and an in-memory store for tests.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryExperimentStore;
pub use sqlite::SqliteExperimentStore;
