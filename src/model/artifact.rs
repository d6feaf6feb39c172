//! Model artifact persistence
//!
//! A trained network is stored as a single MessagePack file written by Burn's
//! named recorder at full precision. Next to the weights it carries the
//! topology metadata, so the network can be rebuilt without any training code
//! and checked against the label vocabulary it will be paired with.

use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Record, Recorder},
    tensor::backend::Backend,
};
use tracing::info;

use super::cnn::{PlantCnn, PlantCnnConfig, PlantCnnRecord};
use crate::utils::error::{PlantError, Result};

/// Bumped whenever the stored layout changes
pub const ARTIFACT_FORMAT_VERSION: usize = 1;

/// Extension added by the recorder
pub const ARTIFACT_EXTENSION: &str = "mpk";

/// Everything written to a model artifact
#[derive(Record)]
pub struct PlantCnnArtifact<B: Backend> {
    pub format_version: usize,
    pub input_size: usize,
    pub in_channels: usize,
    pub hidden_units: usize,
    pub dropout: f64,
    pub num_classes: usize,
    pub model: PlantCnnRecord<B>,
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Path of the file actually written for `path`
pub fn artifact_path(path: &Path) -> PathBuf {
    path.with_extension(ARTIFACT_EXTENSION)
}

/// Save `model`, built from `config`, to `path`
///
/// The recorder sets the `.mpk` extension; the returned path is the file on
/// disk.
pub fn save_model<B: Backend>(
    model: &PlantCnn<B>,
    config: &PlantCnnConfig,
    path: &Path,
) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let artifact = PlantCnnArtifact::<B> {
        format_version: ARTIFACT_FORMAT_VERSION,
        input_size: config.input_size,
        in_channels: config.in_channels,
        hidden_units: config.hidden_units,
        dropout: config.dropout,
        num_classes: config.num_classes,
        model: model.clone().into_record(),
    };

    Recorder::<B>::record(&recorder(), artifact, path.to_path_buf())
        .map_err(|e| PlantError::Model(format!("Failed to save model to {:?}: {:?}", path, e)))?;

    let written = artifact_path(path);
    info!("Saved model ({} classes) to {:?}", config.num_classes, written);
    Ok(written)
}

/// Load a model saved by [`save_model`]
///
/// Fails with `ArtifactMismatch` when the stored class count differs from
/// `expected_classes`.
pub fn load_model<B: Backend>(
    path: &Path,
    expected_classes: usize,
    device: &B::Device,
) -> Result<(PlantCnn<B>, PlantCnnConfig)> {
    let file = artifact_path(path);
    if !file.exists() {
        return Err(PlantError::PathNotFound(file));
    }

    let artifact: PlantCnnArtifact<B> =
        Recorder::<B>::load(&recorder(), path.to_path_buf(), device).map_err(|e| {
            PlantError::Model(format!("Failed to load model from {:?}: {:?}", file, e))
        })?;

    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PlantError::Model(format!(
            "Unsupported model format version {} (expected {})",
            artifact.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }

    if artifact.num_classes != expected_classes {
        return Err(PlantError::ArtifactMismatch {
            expected: expected_classes,
            found: artifact.num_classes,
        });
    }

    let config = PlantCnnConfig::new(artifact.num_classes)
        .with_input_size(artifact.input_size)
        .with_in_channels(artifact.in_channels)
        .with_hidden_units(artifact.hidden_units)
        .with_dropout(artifact.dropout);
    let model = config.init::<B>(device).load_record(artifact.model);

    info!("Loaded model ({} classes) from {:?}", config.num_classes, file);
    Ok((model, config))
}
