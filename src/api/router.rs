//! Inference API router.
//!
//! NOTE: Path params would use `:param` syntax (matchit 0.7 / axum 0.7);
//! none of the current routes take any.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the router with every public route.
pub fn inference_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .route("/predict", post(endpoints::predict::predict))
        .route("/local-predict", post(endpoints::predict::local_predict))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use image::{Rgb, RgbImage};
    use tower::ServiceExt;

    use super::*;
    use crate::classifier::{FixedClassifier, ModelRegistry};
    use crate::gateway::testing::{FakeGateway, FakeTransfer};
    use crate::models::{ModelKind, StorageProtocol};
    use crate::pipeline::Orchestrator;

    const EVALSCRIPTS: [&str; 5] = [
        "thermal",
        "natural",
        "optical-thickness",
        "moisture",
        "chlorophyll",
    ];

    fn test_router(staging_root: &Path, transfer: FakeTransfer) -> Router {
        let models = ModelRegistry::new()
            .with_model(ModelKind::Unified, Arc::new(FixedClassifier::new(vec![0.35])))
            .with_model(
                ModelKind::Beznau,
                Arc::new(FixedClassifier::new(vec![0.95, 0.1])),
            );
        let orchestrator = Orchestrator::new(
            Arc::new(models),
            Arc::new(FakeGateway::default()),
            Arc::new(transfer),
            staging_root.to_path_buf(),
            StorageProtocol::S3,
        );
        inference_router(ApiContext::new(
            Arc::new(orchestrator),
            Some("http://gateway.test:8000".into()),
        ))
    }

    fn write_images(dir: &Path) -> Vec<String> {
        (0..5)
            .map(|i| {
                let path = dir.join(format!("img{i}.png"));
                RgbImage::from_pixel(16, 16, Rgb([i * 40, 0, 0])).save(&path).unwrap();
                path.to_string_lossy().to_string()
            })
            .collect()
    }

    fn remote_paths() -> Vec<String> {
        EVALSCRIPTS
            .iter()
            .map(|e| format!("study/tr1/42/2024-03-01T00:00/sentinel/s2_{e}_f00d.png"))
            .collect()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_returns_liveness_text() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], endpoints::health::LIVENESS_MARKER.as_bytes());
    }

    #[tokio::test]
    async fn health_lists_models() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["models"], serde_json::json!(["unified", "beznau"]));
        assert_eq!(json["gateway_configured"], true);
    }

    #[tokio::test]
    async fn local_predict_beznau_returns_two_towers() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = post_json(
            "/local-predict",
            serde_json::json!({ "images": write_images(dir.path()), "model_name": "beznau" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["label"], "beznau_tower_1");
        assert_eq!(data[0]["prediction"], "ON");
        assert_eq!(data[1]["label"], "beznau_tower_2");
        assert_eq!(data[1]["prediction"], "OFF");
        for entry in data {
            let confidence = entry["confidence"].as_f64().unwrap();
            assert!((0.5..=1.0).contains(&confidence));
        }
    }

    #[tokio::test]
    async fn predict_unified_with_direct_images() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = post_json(
            "/predict",
            serde_json::json!({ "images": write_images(dir.path()), "model_name": "UNIFIED" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["data"][0]["label"], "unified");
        assert_eq!(json["data"][0]["prediction"], "OFF");
    }

    #[tokio::test]
    async fn predict_remote_paths_end_to_end() {
        let fixtures = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let objects: HashMap<String, PathBuf> = remote_paths()
            .into_iter()
            .zip(write_images(fixtures.path()))
            .map(|(rel, file)| (rel, PathBuf::from(file)))
            .collect();
        let app = test_router(staging.path(), FakeTransfer::with_objects(objects));

        let req = post_json(
            "/predict",
            serde_json::json!({ "relative_paths": remote_paths(), "model_name": "unified" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn wrong_count_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = post_json(
            "/predict",
            serde_json::json!({ "images": ["a", "b", "c", "d"], "model_name": "unified" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Exactly 5 images required, Received 4.");
    }

    #[tokio::test]
    async fn band_order_violation_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let mut paths = remote_paths();
        paths.swap(0, 4);
        let req = post_json(
            "/predict",
            serde_json::json!({ "relative_paths": paths, "model_name": "unified" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("position 0"));
        assert!(message.contains("thermal"));
    }

    #[tokio::test]
    async fn local_predict_rejects_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = post_json(
            "/local-predict",
            serde_json::json!({ "relative_paths": remote_paths(), "model_name": "unified" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn wrong_field_type_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = post_json(
            "/predict",
            serde_json::json!({ "images": "not-a-list", "model_name": "unified" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_remote_object_is_500_envelope() {
        let staging = tempfile::tempdir().unwrap();
        let app = test_router(staging.path(), FakeTransfer::default());

        let req = post_json(
            "/predict",
            serde_json::json!({ "relative_paths": remote_paths(), "model_name": "unified" }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = json_body(response).await;
        assert_eq!(json["error_type"], "TransferError");
        assert!(json["details"].is_string());
        assert!(json["traceback"].is_array());
        let staging_str = staging.path().to_string_lossy().to_string();
        assert!(!json.to_string().contains(&staging_str));
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path(), FakeTransfer::default());

        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
