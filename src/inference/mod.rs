//! Inference module
//!
//! - `service`: load the model and vocabulary artifacts, classify single images
//! - `disease_info`: treatment recommendations for predicted labels

pub mod disease_info;
pub mod service;

pub use disease_info::{DiseaseInfo, DiseaseInfoTable};
pub use service::{HealthStatus, InferenceService, Prediction};
