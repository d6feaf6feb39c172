//! Error Handling Module
//!
//! Defines the error type shared by the training and inference pipelines.
//! Per-file decode failures while cleaning a corpus are recovered locally and
//! only counted; every other variant is fatal and propagates to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for PlantCare operations
#[derive(Error, Debug)]
pub enum PlantError {
    /// Input could not be interpreted as an image
    #[error("Failed to decode image '{input}': {reason}")]
    Decode { input: String, reason: String },

    /// Training or validation partition has no classes or no samples
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Persisted model output size disagrees with the label vocabulary
    #[error("Model artifact mismatch: vocabulary has {expected} classes but the model was trained for {found}")]
    ArtifactMismatch { expected: usize, found: usize },

    /// Inference requested before the service finished loading
    #[error("Inference service is not ready: call load() first")]
    ServiceNotReady,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model operations
    #[error("Model error: {0}")]
    Model(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlantError {
    /// Build a decode error for a file on disk
    pub fn decode_path(path: &std::path::Path, reason: impl ToString) -> Self {
        PlantError::Decode {
            input: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a decode error for an in-memory buffer
    pub fn decode_bytes(len: usize, reason: impl ToString) -> Self {
        PlantError::Decode {
            input: format!("<{} bytes>", len),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for PlantError {
    fn from(err: serde_json::Error) -> Self {
        PlantError::Serialization(err.to_string())
    }
}

/// Convenience Result type for PlantCare operations
pub type Result<T> = std::result::Result<T, PlantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlantError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "Dataset error: test error");
    }

    #[test]
    fn test_decode_error_names_source() {
        let err = PlantError::decode_path(std::path::Path::new("/data/leaf.jpg"), "bad header");
        let msg = err.to_string();
        assert!(msg.contains("leaf.jpg"));
        assert!(msg.contains("bad header"));

        let err = PlantError::decode_bytes(12, "unknown format");
        assert!(err.to_string().contains("<12 bytes>"));
    }

    #[test]
    fn test_artifact_mismatch_display() {
        let err = PlantError::ArtifactMismatch {
            expected: 3,
            found: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PlantError = io_err.into();
        assert!(matches!(err, PlantError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: PlantError = json_err.into();
        assert!(matches!(err, PlantError::Serialization(_)));
    }
}
