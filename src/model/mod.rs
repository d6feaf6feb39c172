//! Model module
//!
//! - `cnn`: the network and its Burn `Config`
//! - `classifier`: the network paired with its optimizer, one step at a time
//! - `artifact`: saving and loading trained networks
//! - `config`: training hyperparameters

pub mod artifact;
pub mod classifier;
pub mod cnn;
pub mod config;

pub use artifact::{load_model, save_model, PlantCnnArtifact};
pub use classifier::{adam_classifier, Classifier, StepMetrics};
pub use cnn::{PlantCnn, PlantCnnConfig};
pub use config::TrainingConfig;
