//! Prediction endpoints.
//!
//! The orchestrator blocks on file I/O, the gateway and the model, so each
//! request runs on a tokio blocking worker.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::PredictionResponse;
use crate::pipeline::{Endpoint, PredictRequest};

/// `POST /predict`: direct paths or encoded storage paths.
pub async fn predict(
    State(ctx): State<ApiContext>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    run(ctx, body, Endpoint::Predict).await
}

/// `POST /local-predict`: direct paths only.
pub async fn local_predict(
    State(ctx): State<ApiContext>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    run(ctx, body, Endpoint::LocalPredict).await
}

async fn run(
    ctx: ApiContext,
    body: Result<Json<PredictRequest>, JsonRejection>,
    endpoint: Endpoint,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = body?;
    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, ?endpoint, "Prediction request received");

    let orchestrator = ctx.orchestrator.clone();
    let response =
        tokio::task::spawn_blocking(move || orchestrator.handle(request, endpoint, request_id))
            .await??;

    Ok(Json(response))
}
