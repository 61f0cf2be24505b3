//! HTTP inference service for the trained heart-disease classifier.
//!
//! Library surface used by the `cardio-serve` binary and by integration
//! tests: configuration loading, the shared application state, and the
//! router with its handlers.

pub mod config;
pub mod service;

pub use service::{build_router, health_handler, predict_handler, AppState, PredictionResponse};
