//! Training module
//!
//! Supervised training of the plant disease CNN on a train/validation pair of
//! class-per-directory trees, and the end-to-end pipeline that cleans the
//! data, trains, and writes the model and vocabulary artifacts.

pub mod trainer;

pub use trainer::{
    run_pipeline, train, EpochReport, PipelineConfig, PipelineReport, TrainingHistory,
    TrainingOutcome,
};

// Re-export TrainingConfig from model::config where it's defined
pub use crate::model::config::TrainingConfig;
