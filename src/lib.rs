//! # PlantCare
//!
//! Plant leaf disease classification with the Burn framework.
//!
//! ## Pipelines
//!
//! - **Training**: clean a class-per-directory corpus, split it into
//!   train/validation trees, train a small CNN, and write the model artifact
//!   together with its label vocabulary.
//! - **Inference**: load both artifacts once, then classify single images into
//!   a label, a confidence and a healthy/diseased status.
//!
//! ## Modules
//!
//! - `dataset`: cleaning, splitting, vocabulary, preprocessing and batching
//! - `model`: CNN architecture, optimizer step, artifact persistence
//! - `training`: epoch loop and the end-to-end training pipeline
//! - `inference`: the inference service and treatment recommendations
//! - `utils`: errors and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plantcare::backend::{default_device, DefaultBackend};
//! use plantcare::inference::InferenceService;
//!
//! let mut service = InferenceService::<DefaultBackend>::new(default_device());
//! service.load("artifacts/plant_cnn".as_ref(), "artifacts/class_names.json".as_ref())?;
//! let prediction = service.classify_path("leaf.jpg".as_ref())?;
//! println!("{} ({:.2}%)", prediction.display_label(), prediction.confidence);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{
    split_dataset, validate_images, BatchSource, ImageInput, ImagePreprocessor, LabelVocabulary,
    SplitConfig,
};
pub use inference::{DiseaseInfoTable, HealthStatus, InferenceService, Prediction};
pub use model::{PlantCnn, PlantCnnConfig, TrainingConfig};
pub use training::{run_pipeline, train, PipelineConfig, TrainingHistory};
pub use utils::error::{PlantError, Result};

/// Network input side length in pixels
pub const IMAGE_SIZE: usize = dataset::IMAGE_SIZE;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
