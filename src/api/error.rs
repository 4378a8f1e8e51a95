//! API error type and its JSON envelope.
//!
//! Caller errors render as `{"error": msg}` with 400. Server-side failures
//! render as 500 with `details`, `error_type` and `traceback` added.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::{PredictError, ValidationError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Internal {
        message: String,
        details: String,
        error_type: &'static str,
        traceback: Vec<String>,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    details: None,
                    error_type: None,
                    traceback: None,
                },
            ),
            ApiError::Internal {
                message,
                details,
                error_type,
                traceback,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: message,
                    details: Some(details),
                    error_type: Some(error_type),
                    traceback: Some(traceback),
                },
            ),
            ApiError::Worker(detail) => {
                tracing::error!(detail, "Prediction worker failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Prediction worker failed".to_string(),
                        details: Some(detail.clone()),
                        error_type: Some("WorkerError"),
                        traceback: Some(vec![detail]),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        if err.is_caller_error() {
            return ApiError::BadRequest(err.to_string());
        }
        let traceback = err.traceback();
        let details = traceback.last().cloned().unwrap_or_default();
        ApiError::Internal {
            message: err.to_string(),
            details,
            error_type: err.error_type(),
            traceback,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(ValidationError::MalformedBody(rejection.body_text()).to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Worker(err.to_string())
    }
}
