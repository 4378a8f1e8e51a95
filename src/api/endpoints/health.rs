//! Liveness and health endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

/// Body of `GET /`.
pub const LIVENESS_MARKER: &str = "Sentinel inference API running";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub models: Vec<&'static str>,
    pub gateway_configured: bool,
}

/// `GET /`: plain-text liveness marker.
pub async fn root() -> &'static str {
    LIVENESS_MARKER
}

/// `GET /health`: container probe. Does not contact the gateway.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        models: ctx.orchestrator.models().loaded(),
        gateway_configured: ctx.gateway_url.is_some(),
    })
}
