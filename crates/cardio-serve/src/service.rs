//! Request handlers and shared state for the inference service.
//!
//! The trained artifact is loaded once at startup and shared read-only
//! across handlers through an `Arc`; no request ever mutates it, so
//! concurrent handlers need no locking. Validation failures are turned
//! into structured 4xx responses before the model is touched.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cardio_core::{FeatureRecord, ServeConfig};
use cardio_model::{round_probability, TrainedArtifact};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state threaded through axum handlers via [`State`].
///
/// Constructed once during startup and never mutated afterwards.
pub struct AppState {
    /// Service configuration.
    pub config: ServeConfig,
    /// The trained artifact, loaded and schema-checked at startup.
    pub artifact: TrainedArtifact,
}

/// Build the axum [`Router`] with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/predict", post(predict_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response body for `POST /predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted class (0 = no disease, 1 = disease present).
    pub prediction: u8,
    /// Probability of class 1, rounded to 4 decimal places.
    pub confidence: f64,
}

/// API error response body.
#[derive(Debug, Serialize)]
struct ApiError {
    error: ApiErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

impl ApiError {
    fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                message: message.into(),
                error_type: error_type.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — liveness only; never touches the model.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Heart disease model is running",
    }))
}

/// `POST /predict` — validate the 13-field record, build the feature row
/// in training column order, and apply the frozen pipeline.
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeatureRecord>, JsonRejection>,
) -> Response {
    let Json(record) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            // The serde message names the offending field; pass it through.
            let body = ApiError::new("validation_error", rejection.body_text());
            return (rejection.status(), Json(body)).into_response();
        }
    };

    let row = record.to_row();
    match state.artifact.pipeline.predict_one(&row) {
        Ok((prediction, probability)) => {
            let body = PredictionResponse {
                prediction,
                confidence: round_probability(probability),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Inference failed");
            let body = ApiError::new("inference_error", "model inference failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
