//! Training Configuration Module
//!
//! Hyperparameters for the training loop, persisted as JSON so a run can be
//! repeated from a file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::cnn::PlantCnnConfig;
use crate::utils::error::{PlantError, Result};

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Batch size for training and validation
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Seed for batch shuffling and mirror augmentation; weight init is not seeded
    pub seed: u64,

    /// Input image size (width and height)
    pub image_size: usize,

    /// Width of the dense layer
    pub hidden_units: usize,

    /// Dropout rate after the dense layer
    pub dropout: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            learning_rate: 1e-3,
            seed: 42,
            image_size: 128,
            hidden_units: 128,
            dropout: 0.5,
        }
    }
}

impl TrainingConfig {
    /// Create a fast training config for debugging
    pub fn debug() -> Self {
        Self {
            epochs: 1,
            batch_size: 4,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(PlantError::Config("epochs must be greater than 0".to_string()));
        }

        if self.batch_size == 0 {
            return Err(PlantError::Config("batch_size must be greater than 0".to_string()));
        }

        if !(self.learning_rate > 0.0) {
            return Err(PlantError::Config("learning_rate must be positive".to_string()));
        }

        // Three valid 3x3 convolutions with 2x2 pooling need at least 22 pixels
        if self.image_size < 22 {
            return Err(PlantError::Config(format!(
                "image_size must be at least 22, got {}",
                self.image_size
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PlantError::Config("dropout must be in range [0.0, 1.0)".to_string()));
        }

        Ok(())
    }

    /// Network configuration for a vocabulary of `num_classes` labels
    pub fn model_config(&self, num_classes: usize) -> PlantCnnConfig {
        PlantCnnConfig::new(num_classes)
            .with_input_size(self.image_size)
            .with_hidden_units(self.hidden_units)
            .with_dropout(self.dropout)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlantError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
