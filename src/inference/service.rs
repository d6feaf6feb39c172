//! Single-image inference service
//!
//! Loads a trained model and its label vocabulary once, then classifies images
//! one at a time. `classify` borrows the service immutably and allocates its
//! own tensors. Burn parameters are not `Sync`, so concurrent callers each take
//! a clone: clones share the model's tensor storage and need no locking.

use std::path::Path;

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{ImageInput, ImagePreprocessor, LabelVocabulary};
use crate::model::{load_model, PlantCnn};
use crate::utils::error::{PlantError, Result};

/// Coarse health status derived from a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Diseased,
}

impl HealthStatus {
    /// `Healthy` iff the label contains "healthy", case-insensitively
    pub fn from_label(label: &str) -> Self {
        if label.to_lowercase().contains("healthy") {
            HealthStatus::Healthy
        } else {
            HealthStatus::Diseased
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Diseased => write!(f, "Diseased"),
        }
    }
}

/// Outcome of classifying one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Vocabulary label, e.g. "Tomato___Late_blight"
    pub label: String,
    pub class_index: usize,
    /// Probability of the predicted class, in percent
    pub confidence: f32,
    pub status: HealthStatus,
}

impl Prediction {
    /// Label formatted for display: "Tomato___Late_blight" → "Tomato - Late_blight"
    pub fn display_label(&self) -> String {
        self.label.replace("___", " - ")
    }
}

#[derive(Clone)]
enum ServiceState<B: Backend> {
    Uninitialized,
    Ready {
        model: PlantCnn<B>,
        vocabulary: LabelVocabulary,
        preprocessor: ImagePreprocessor,
    },
}

#[derive(Clone)]
pub struct InferenceService<B: Backend> {
    device: B::Device,
    state: ServiceState<B>,
}

impl<B: Backend> InferenceService<B> {
    /// Create a service that is not ready until [`InferenceService::load`] succeeds
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            state: ServiceState::Uninitialized,
        }
    }

    /// Load the vocabulary and the model checked against it
    ///
    /// The service switches to the new pair only when both load. On error the
    /// previous state, ready or not, is kept.
    pub fn load(&mut self, model_path: &Path, vocab_path: &Path) -> Result<()> {
        let vocabulary = LabelVocabulary::load(vocab_path)?;
        let (model, config) = load_model::<B>(model_path, vocabulary.len(), &self.device)?;
        let preprocessor = ImagePreprocessor::new(config.input_size)?;

        info!(
            "Inference service ready: {} classes, {}x{} input",
            vocabulary.len(),
            config.input_size,
            config.input_size
        );

        self.state = ServiceState::Ready {
            model,
            vocabulary,
            preprocessor,
        };
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready { .. })
    }

    pub fn vocabulary(&self) -> Option<&LabelVocabulary> {
        match &self.state {
            ServiceState::Ready { vocabulary, .. } => Some(vocabulary),
            ServiceState::Uninitialized => None,
        }
    }

    /// Classify one image
    pub fn classify(&self, input: ImageInput<'_>) -> Result<Prediction> {
        let ServiceState::Ready {
            model,
            vocabulary,
            preprocessor,
        } = &self.state
        else {
            return Err(PlantError::ServiceNotReady);
        };

        let pixels = preprocessor.preprocess_for_inference(input)?;
        let probabilities = model.predict_probabilities(pixels, &self.device)?;

        let (class_index, probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .ok_or_else(|| PlantError::Model("Model produced no probabilities".to_string()))?;

        let label = vocabulary
            .get(class_index)
            .ok_or(PlantError::ArtifactMismatch {
                expected: vocabulary.len(),
                found: probabilities.len(),
            })?
            .to_string();

        let confidence = (probability * 100.0).clamp(0.0, 100.0);
        debug!("Predicted {} ({:.2}%)", label, confidence);

        Ok(Prediction {
            status: HealthStatus::from_label(&label),
            label,
            class_index,
            confidence,
        })
    }

    pub fn classify_path(&self, path: &Path) -> Result<Prediction> {
        self.classify(ImageInput::Path(path))
    }

    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        self.classify(ImageInput::Bytes(bytes))
    }
}
