//! End-to-end tests for the inference service.
//!
//! Each test trains a small deterministic pipeline, exports it through
//! the real artifact path, loads it back the way the binary does at
//! startup, and drives the router with real HTTP requests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use cardio_core::{ServeConfig, FEATURE_COUNT};
use cardio_model::{ModelParams, ModelPipeline, RandomForestParams, TrainedArtifact};
use cardio_serve::{build_router, AppState};
use ndarray::Array2;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Synthetic training data separable on `thalach`, `exang`, `oldpeak`, `ca`.
fn synthetic_dataset(n: usize) -> (Array2<f64>, Vec<u8>) {
    let mut flat = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n {
        let sick = i % 2 == 1;
        let v = (i / 2) as f64;
        flat.extend_from_slice(&[
            50.0 + v,
            (i % 2) as f64,
            (i % 4) as f64,
            125.0 + v,
            210.0 + 2.0 * v,
            0.0,
            1.0,
            if sick { 110.0 + v } else { 160.0 + v },
            f64::from(sick),
            if sick { 2.5 } else { 0.5 },
            1.0,
            f64::from(sick),
            2.0,
        ]);
        labels.push(u8::from(sick));
    }
    (
        Array2::from_shape_vec((n, FEATURE_COUNT), flat).unwrap(),
        labels,
    )
}

/// Train and export an artifact to `path`, exactly like the finalize stage.
fn export_artifact(path: &Path) {
    let (x, y) = synthetic_dataset(40);
    let params = ModelParams::RandomForest(RandomForestParams {
        n_trees: 20,
        max_depth: Some(8),
        min_samples_split: 2,
        seed: 42,
    });
    let pipeline = ModelPipeline::fit(x.view(), &y, &params).unwrap();
    TrainedArtifact::new(pipeline, params.to_map())
        .save(path)
        .unwrap();
}

/// Load the artifact from disk the way the binary does and build a router.
fn app_from_artifact(path: &Path) -> Router {
    let artifact = TrainedArtifact::load(path).unwrap();
    let state = Arc::new(AppState {
        config: ServeConfig {
            artifact_path: path.display().to_string(),
            ..ServeConfig::default()
        },
        artifact,
    });
    build_router(state)
}

fn sample_input() -> serde_json::Value {
    serde_json::json!({
        "age": 55, "sex": 1, "cp": 2, "trestbps": 130, "chol": 250,
        "fbs": 0, "restecg": 1, "thalach": 150, "exang": 0,
        "oldpeak": 1.5, "slope": 1, "ca": 0, "thal": 2
    })
}

fn predict_request(body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_round_trip_from_artifact_to_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts/model.json");
    export_artifact(&path);

    let app = app_from_artifact(&path);

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let response = app.oneshot(predict_request(&sample_input())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let prediction = json["prediction"].as_u64().unwrap();
    let confidence = json["confidence"].as_f64().unwrap();
    assert!(prediction == 0 || prediction == 1);
    assert!((0.0..=1.0).contains(&confidence));
}

#[tokio::test]
async fn reloading_the_same_artifact_reproduces_the_same_answer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    export_artifact(&path);

    let first = body_json(
        app_from_artifact(&path)
            .oneshot(predict_request(&sample_input()))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app_from_artifact(&path)
            .oneshot(predict_request(&sample_input()))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn startup_fails_without_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(TrainedArtifact::load(&missing).is_err());
}

#[tokio::test]
async fn startup_fails_on_a_tampered_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    export_artifact(&path);

    let mut raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    raw["schema_version"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

    assert!(TrainedArtifact::load(&path).is_err());
}

#[tokio::test]
async fn malformed_bodies_never_reach_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    export_artifact(&path);
    let app = app_from_artifact(&path);

    // Missing field, wrong type, extra field, and syntactically broken JSON.
    let mut missing = sample_input();
    missing.as_object_mut().unwrap().remove("ca");
    let response = app.clone().oneshot(predict_request(&missing)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut mistyped = sample_input();
    mistyped["oldpeak"] = serde_json::json!("high");
    let response = app
        .clone()
        .oneshot(predict_request(&mistyped))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let broken = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(broken).await.unwrap();
    assert!(response.status().is_client_error());

    // The service still answers correctly afterwards.
    let response = app.oneshot(predict_request(&sample_input())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
