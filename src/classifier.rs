//! Model provider: the two pretrained networks behind one trait.
//!
//! Networks are loaded once at startup into a [`ModelRegistry`] and shared
//! read-only (`Arc`) across requests. The ONNX Runtime backend lives behind
//! the `onnx-models` feature; [`FixedClassifier`] stands in for it in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{BEZNAU_MODEL_FILE, UNIFIED_MODEL_FILE};
use crate::models::ModelKind;
use crate::pipeline::ImageTensor;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model '{0}' is not loaded")]
    NotLoaded(ModelKind),

    #[error("Model artifact not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model initialization: {0}")]
    ModelInit(String),

    #[error("Model inference failed: {0}")]
    Backend(String),

    #[error("Model '{model}' returned {found} probabilities, expected {expected}")]
    OutputArity {
        model: ModelKind,
        expected: usize,
        found: usize,
    },

    #[error("Model '{model}' returned a non-finite probability for head {head}")]
    NonFinite { model: ModelKind, head: usize },
}

/// Opaque network: one probability per output head, for a batch of one.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

// ═══════════════════════════════════════════════════════════
// ONNX classifier (`onnx-models` feature)
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-models")]
mod onnx {
    use super::{Classifier, InferenceError};
    use crate::pipeline::ImageTensor;
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// Keras-exported network run through ONNX Runtime.
    ///
    /// Input: NHWC `[1, 256, 256, 15]` f32. Each output is `[1, 1]`; the
    /// beznau network has two outputs, read in declaration order.
    ///
    /// `Session::run` needs `&mut self`, hence the Mutex.
    pub struct OnnxClassifier {
        session: Mutex<Session>,
    }

    impl OnnxClassifier {
        pub fn load(model_path: &Path) -> Result<Self, InferenceError> {
            if !model_path.exists() {
                return Err(InferenceError::ModelNotFound(model_path.to_path_buf()));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| InferenceError::ModelInit(e.to_string()))?
                .with_intra_threads(1)
                .map_err(|e: ort::Error| InferenceError::ModelInit(e.to_string()))?
                .commit_from_file(model_path)
                .map_err(|e: ort::Error| {
                    InferenceError::ModelInit(format!("ONNX load failed: {e}"))
                })?;

            tracing::info!("ONNX classifier loaded from {}", model_path.display());

            Ok(Self {
                session: Mutex::new(session),
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
            use ort::value::TensorRef;

            let batch = input.to_batch();
            let tensor = TensorRef::from_array_view(&batch)
                .map_err(|e| InferenceError::Backend(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| InferenceError::Backend("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| InferenceError::Backend(format!("ONNX inference failed: {e}")))?;

            let mut probabilities = Vec::with_capacity(outputs.len());
            for index in 0..outputs.len() {
                let (_shape, data) = outputs[index]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| InferenceError::Backend(format!("Output extraction: {e}")))?;
                let first = data.first().copied().ok_or_else(|| {
                    InferenceError::Backend(format!("Output {index} is empty"))
                })?;
                probabilities.push(first);
            }
            Ok(probabilities)
        }
    }
}

#[cfg(feature = "onnx-models")]
pub use onnx::OnnxClassifier;

/// Classifier that always answers the same probabilities.
pub struct FixedClassifier {
    probabilities: Vec<f32>,
}

impl FixedClassifier {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self { probabilities }
    }
}

impl Classifier for FixedClassifier {
    fn predict(&self, _input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        Ok(self.probabilities.clone())
    }
}

// ═══════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════

/// Loaded networks keyed by model kind.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<ModelKind, Arc<dyn Classifier>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, kind: ModelKind, classifier: Arc<dyn Classifier>) -> Self {
        self.models.insert(kind, classifier);
        self
    }

    /// Load both networks from `model_dir`.
    #[cfg(feature = "onnx-models")]
    pub fn load(model_dir: &Path) -> Result<Self, InferenceError> {
        let mut registry = Self::new();
        for kind in ModelKind::ALL {
            let classifier = OnnxClassifier::load(&model_dir.join(artifact_name(kind)))?;
            registry = registry.with_model(kind, Arc::new(classifier));
        }
        Ok(registry)
    }

    /// Without the ONNX backend there is nothing to load from disk.
    #[cfg(not(feature = "onnx-models"))]
    pub fn load(model_dir: &Path) -> Result<Self, InferenceError> {
        Err(InferenceError::ModelInit(format!(
            "built without the `onnx-models` feature; cannot load {}",
            model_dir.join(artifact_name(ModelKind::Unified)).display()
        )))
    }

    /// Names of the loaded networks, in canonical order.
    pub fn loaded(&self) -> Vec<&'static str> {
        ModelKind::ALL
            .iter()
            .filter(|kind| self.models.contains_key(*kind))
            .map(|kind| kind.as_str())
            .collect()
    }

    /// Run `kind` on `input` and check the output shape.
    ///
    /// Returns exactly `kind.output_heads()` finite probabilities.
    pub fn predict(&self, kind: ModelKind, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let classifier = self
            .models
            .get(&kind)
            .ok_or(InferenceError::NotLoaded(kind))?;

        let probabilities = classifier.predict(input)?;

        if probabilities.len() != kind.output_heads() {
            return Err(InferenceError::OutputArity {
                model: kind,
                expected: kind.output_heads(),
                found: probabilities.len(),
            });
        }
        if let Some(head) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite { model: kind, head });
        }
        Ok(probabilities)
    }
}

/// Artifact file name for `kind` inside the model directory.
pub fn artifact_name(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Unified => UNIFIED_MODEL_FILE,
        ModelKind::Beznau => BEZNAU_MODEL_FILE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        ModelRegistry::new()
            .with_model(ModelKind::Unified, Arc::new(FixedClassifier::new(vec![0.8])))
            .with_model(ModelKind::Beznau, Arc::new(FixedClassifier::new(vec![0.3, 0.6])))
    }

    #[test]
    fn predict_returns_one_probability_per_head() {
        let input = ImageTensor::zeros();
        assert_eq!(registry().predict(ModelKind::Unified, &input).unwrap(), vec![0.8]);
        assert_eq!(
            registry().predict(ModelKind::Beznau, &input).unwrap(),
            vec![0.3, 0.6]
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let registry = ModelRegistry::new()
            .with_model(ModelKind::Beznau, Arc::new(FixedClassifier::new(vec![0.3])));
        let err = registry
            .predict(ModelKind::Beznau, &ImageTensor::zeros())
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceError::OutputArity { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn non_finite_probability_is_rejected() {
        let registry = ModelRegistry::new()
            .with_model(ModelKind::Unified, Arc::new(FixedClassifier::new(vec![f32::NAN])));
        let err = registry
            .predict(ModelKind::Unified, &ImageTensor::zeros())
            .unwrap_err();
        assert!(matches!(err, InferenceError::NonFinite { head: 0, .. }));
    }

    #[test]
    fn missing_model_is_reported() {
        let registry = ModelRegistry::new();
        let err = registry
            .predict(ModelKind::Unified, &ImageTensor::zeros())
            .unwrap_err();
        assert!(matches!(err, InferenceError::NotLoaded(ModelKind::Unified)));
        assert!(registry.loaded().is_empty());
    }

    #[test]
    fn loaded_lists_in_canonical_order() {
        assert_eq!(registry().loaded(), vec!["unified", "beznau"]);
    }

    #[test]
    fn artifact_names() {
        assert_eq!(artifact_name(ModelKind::Unified), "Unified_model.onnx");
        assert_eq!(artifact_name(ModelKind::Beznau), "Unified_Beznau_model.onnx");
    }

    #[cfg(feature = "onnx-models")]
    #[test]
    fn load_reports_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        match ModelRegistry::load(dir.path()) {
            Err(InferenceError::ModelNotFound(path)) => {
                assert_eq!(path, dir.path().join("Unified_model.onnx"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("load succeeded without artifacts"),
        }
    }

    #[cfg(not(feature = "onnx-models"))]
    #[test]
    fn load_without_backend_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelRegistry::load(dir.path()),
            Err(InferenceError::ModelInit(_))
        ));
    }
}
