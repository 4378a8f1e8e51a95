//! Request validation → image assembly → inference → result shaping.

pub mod assembly;
pub mod bands;
pub mod orchestrator;
pub mod probability;
pub mod staging;

pub use assembly::{ImageSource, ImageTensor};
pub use orchestrator::{Endpoint, Orchestrator, PredictRequest, Stage};

use thiserror::Error;

use crate::classifier::InferenceError;
use crate::gateway::{GatewayError, TransferError};
use crate::models::PathCodecError;

/// Caller-fixable request problems. Always reported as 400.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    #[error("Invalid input. JSON with key \"model_name\" is required.")]
    MissingModelName,

    #[error("Invalid input. JSON with key \"images\" or \"relative_paths\" is required.")]
    MissingImages,

    #[error("Invalid input. Provide either \"images\" or \"relative_paths\", not both.")]
    AmbiguousSource,

    #[error("Invalid input. This endpoint only accepts local \"images\", not \"relative_paths\".")]
    RemoteNotAllowed,

    #[error("Exactly 5 images required, Received {received}.")]
    CountMismatch { received: usize },

    #[error("Invalid model name '{given}'. Please choose from {}", .supported.join(", "))]
    UnsupportedModel {
        given: String,
        supported: Vec<&'static str>,
    },

    #[error("Invalid relative path at position {position}: {source}")]
    MalformedPath {
        position: usize,
        #[source]
        source: PathCodecError,
    },

    #[error("Wrong band at position {position}: expected the '{expected}' band, got evalscript '{actual}'")]
    BandOrder {
        position: usize,
        expected: &'static str,
        actual: String,
    },
}

/// Failures while turning validated references into a tensor.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Failed to obtain a signed download URL for image {position} ({relative_path})")]
    SignedUrl {
        position: usize,
        relative_path: String,
        #[source]
        source: GatewayError,
    },

    #[error("Failed to download image {position} ({relative_path})")]
    Download {
        position: usize,
        relative_path: String,
        #[source]
        source: TransferError,
    },

    #[error("Failed to prepare the staging area")]
    Staging(#[source] std::io::Error),

    #[error("Failed to load image {position} ({reference})")]
    ImageLoad {
        position: usize,
        reference: String,
        #[source]
        source: image::ImageError,
    },
}

impl ResolutionError {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::SignedUrl { .. } => "GatewayError",
            Self::Download { .. } => "TransferError",
            Self::Staging(_) => "StagingError",
            Self::ImageLoad { .. } => "ImageDecodeError",
        }
    }
}

/// Terminal failure of one prediction request.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Validation failures are the caller's to fix; everything else is ours.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Stable class name reported to clients as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Resolution(e) => e.error_type(),
            Self::Inference(_) => "InferenceError",
        }
    }

    /// Messages of this error and every underlying cause, outermost first.
    pub fn traceback(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            chain.push(cause.to_string());
            current = cause.source();
        }
        chain
    }
}
