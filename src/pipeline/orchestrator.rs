use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::assembly::{resolve, validate, ImageSource, ResolveContext};
use super::probability::{to_confidence, to_label};
use super::{PredictError, ValidationError};
use crate::classifier::ModelRegistry;
use crate::gateway::{FileTransfer, StorageGateway};
use crate::models::{ModelKind, PredictionResponse, PredictionResult, StorageProtocol};

/// Lifecycle of one prediction request. `Failed` is reported through the
/// returned error rather than as a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Resolving,
    Predicting,
    Shaping,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Predicting => "predicting",
            Self::Shaping => "shaping",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Which HTTP surface the request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Direct or remote images.
    Predict,
    /// Direct images only.
    LocalPredict,
}

/// Request body shared by both prediction endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub relative_paths: Option<Vec<String>>,
}

impl PredictRequest {
    /// Pick the image source from whichever field is present.
    fn source(self, endpoint: Endpoint) -> Result<(String, ImageSource), ValidationError> {
        let model_name = self.model_name.ok_or(ValidationError::MissingModelName)?;
        let source = match (self.images, self.relative_paths) {
            (Some(_), Some(_)) => return Err(ValidationError::AmbiguousSource),
            (None, None) => return Err(ValidationError::MissingImages),
            (Some(images), None) => ImageSource::Direct(images),
            (None, Some(_)) if endpoint == Endpoint::LocalPredict => {
                return Err(ValidationError::RemoteNotAllowed)
            }
            (None, Some(paths)) => ImageSource::Remote(paths),
        };
        Ok((model_name, source))
    }
}

/// Drives one request through validation, assembly, inference and shaping.
pub struct Orchestrator {
    models: Arc<ModelRegistry>,
    gateway: Arc<dyn StorageGateway>,
    transfer: Arc<dyn FileTransfer>,
    staging_root: PathBuf,
    protocol: StorageProtocol,
}

impl Orchestrator {
    pub fn new(
        models: Arc<ModelRegistry>,
        gateway: Arc<dyn StorageGateway>,
        transfer: Arc<dyn FileTransfer>,
        staging_root: PathBuf,
        protocol: StorageProtocol,
    ) -> Self {
        Self {
            models,
            gateway,
            transfer,
            staging_root,
            protocol,
        }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Run the request to completion. Blocking; call from a worker thread.
    pub fn handle(
        &self,
        request: PredictRequest,
        endpoint: Endpoint,
        request_id: Uuid,
    ) -> Result<PredictionResponse, PredictError> {
        let result = self.run(request, endpoint, request_id);
        if let Err(ref e) = result {
            if e.is_caller_error() {
                tracing::warn!(%request_id, error = %e, "Prediction request rejected");
            } else {
                tracing::error!(
                    %request_id,
                    error_type = e.error_type(),
                    error = %e,
                    "Prediction request failed"
                );
            }
        }
        result
    }

    fn run(
        &self,
        request: PredictRequest,
        endpoint: Endpoint,
        request_id: Uuid,
    ) -> Result<PredictionResponse, PredictError> {
        enter(request_id, Stage::Validating);
        let (model_name, source) = request.source(endpoint)?;
        let mode = source.mode();
        let (validated, kind) = validate(source, &model_name)?;

        enter(request_id, Stage::Resolving);
        let ctx = ResolveContext {
            gateway: self.gateway.as_ref(),
            transfer: self.transfer.as_ref(),
            staging_root: &self.staging_root,
            protocol: self.protocol,
        };
        let tensor = resolve(&validated, &ctx, request_id)?;

        enter(request_id, Stage::Predicting);
        let probabilities = self.models.predict(kind, &tensor)?;

        enter(request_id, Stage::Shaping);
        let data = shape(kind, &probabilities);

        enter(request_id, Stage::Done);
        tracing::info!(%request_id, model = %kind, mode, heads = data.len(), "Prediction complete");
        Ok(PredictionResponse { data })
    }
}

fn enter(request_id: Uuid, stage: Stage) {
    tracing::debug!(%request_id, %stage, "Stage");
}

/// One result per output head, in head order.
pub fn shape(kind: ModelKind, probabilities: &[f32]) -> Vec<PredictionResult> {
    probabilities
        .iter()
        .enumerate()
        .map(|(head, &p)| PredictionResult {
            label: kind.head_label(head),
            prediction: to_label(p),
            confidence: to_confidence(p),
        })
        .collect()
}
