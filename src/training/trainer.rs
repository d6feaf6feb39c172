//! Training loop
//!
//! A plain epoch loop over two endless batch streams: `steps_per_epoch`
//! gradient updates on the training stream, then `validation_steps`
//! evaluation batches on the validation stream. No early stopping and no
//! intermediate checkpoints; the model is saved once, after the last epoch.

use std::path::{Path, PathBuf};

use burn::{
    data::dataloader::batcher::Batcher,
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{
    validate_images, BatchSource, ImageBatch, ImagePreprocessor, LabelVocabulary, PlantBatcher,
    ValidationReport,
};
use crate::model::{adam_classifier, save_model, PlantCnn, PlantCnnConfig, StepMetrics};
use crate::model::config::TrainingConfig;
use crate::utils::error::{PlantError, Result};
use crate::utils::logging::TrainingLogger;

/// Metrics of one completed epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// One-based epoch number
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    /// Training batches consumed this epoch
    pub train_steps: usize,
    pub val_steps: usize,
    pub duration_secs: f64,
}

/// Per-epoch metrics of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochReport>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }

    /// Validation accuracy of the last epoch, 0 when nothing ran
    pub fn final_val_accuracy(&self) -> f64 {
        self.last().map(|e| e.val_accuracy).unwrap_or(0.0)
    }

    /// Save as a JSON array of epoch reports
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Result of a training run
pub struct TrainingOutcome<B: Backend> {
    /// Trained network, without autodiff
    pub model: PlantCnn<B>,
    pub model_config: PlantCnnConfig,
    pub vocabulary: LabelVocabulary,
    pub history: TrainingHistory,
}

/// Running mean of step metrics
#[derive(Default)]
struct MetricsAccumulator {
    loss: f64,
    accuracy: f64,
    steps: usize,
}

impl MetricsAccumulator {
    fn add(&mut self, metrics: StepMetrics) {
        self.loss += metrics.loss;
        self.accuracy += metrics.accuracy;
        self.steps += 1;
    }

    fn mean(&self) -> (f64, f64) {
        let steps = self.steps.max(1) as f64;
        (self.loss / steps, self.accuracy / steps)
    }
}

fn next_batch(source: &mut BatchSource, partition: &str) -> Result<ImageBatch> {
    source
        .next()
        .ok_or_else(|| PlantError::EmptyDataset(format!("{} partition ran dry", partition)))?
}

fn open_source(
    root: &Path,
    vocabulary: &LabelVocabulary,
    config: &TrainingConfig,
    training: bool,
) -> Result<BatchSource> {
    let partition = if training { "Training" } else { "Validation" };
    let source = BatchSource::new(root, vocabulary, config.batch_size, training, Some(config.seed))?
        .with_preprocessor(ImagePreprocessor::new(config.image_size)?);

    if source.is_empty() {
        return Err(PlantError::EmptyDataset(format!(
            "{} partition {:?} has no images",
            partition, root
        )));
    }

    Ok(source)
}

/// Train a new network on `train_root`, validating on `val_root`
///
/// The vocabulary is derived from the class directories of `train_root`.
/// Fails with `EmptyDataset` before any training when there are no classes or
/// either partition has no images.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    train_root: &Path,
    val_root: &Path,
    device: &B::Device,
) -> Result<TrainingOutcome<B::InnerBackend>> {
    config.validate()?;

    let vocabulary = LabelVocabulary::build(train_root)?;
    if vocabulary.is_empty() {
        return Err(PlantError::EmptyDataset(format!(
            "No class directories under {:?}",
            train_root
        )));
    }

    let mut train_source = open_source(train_root, &vocabulary, config, true)?;
    let mut val_source = open_source(val_root, &vocabulary, config, false)?;

    let steps_per_epoch = train_source.steps_per_epoch();
    let validation_steps = val_source.steps_per_epoch();

    info!(
        "Training on {} images ({} steps/epoch), validating on {} images ({} steps), {} classes",
        train_source.len(),
        steps_per_epoch,
        val_source.len(),
        validation_steps,
        vocabulary.len()
    );

    let model_config = config.model_config(vocabulary.len());
    let model = model_config.init::<B>(device);
    let mut classifier = adam_classifier(model, config.learning_rate);
    let batcher = PlantBatcher::<B>::new(config.image_size, vocabulary.len());

    let mut logger = TrainingLogger::new(config.epochs);
    let mut history = TrainingHistory::default();

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);

        let mut train_metrics = MetricsAccumulator::default();
        for step in 0..steps_per_epoch {
            let batch = next_batch(&mut train_source, "Training")?;
            let metrics = classifier.train_step(batcher.batch(batch.samples, device));
            tracing::debug!(
                "Step {}/{}: loss = {:.4}, acc = {:.2}%",
                step + 1,
                steps_per_epoch,
                metrics.loss,
                metrics.accuracy * 100.0
            );
            train_metrics.add(metrics);
        }

        let mut val_metrics = MetricsAccumulator::default();
        for _ in 0..validation_steps {
            let batch = next_batch(&mut val_source, "Validation")?;
            val_metrics.add(classifier.evaluate(batcher.batch(batch.samples, device)));
        }

        let (train_loss, train_accuracy) = train_metrics.mean();
        let (val_loss, val_accuracy) = val_metrics.mean();
        let duration_secs = logger.end_epoch(train_loss, train_accuracy, val_loss, val_accuracy);

        history.epochs.push(EpochReport {
            epoch: epoch + 1,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            train_steps: train_metrics.steps,
            val_steps: val_metrics.steps,
            duration_secs,
        });
    }

    logger.log_complete(history.final_val_accuracy());

    Ok(TrainingOutcome {
        model: classifier.into_inference_model(),
        model_config,
        vocabulary,
        history,
    })
}

/// End-to-end training pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub train_root: PathBuf,
    pub val_root: PathBuf,
    /// Model artifact path; the recorder sets the `.mpk` extension
    pub model_path: PathBuf,
    pub vocab_path: PathBuf,
    /// Remove undecodable images from both roots before training
    pub clean: bool,
    pub training: TrainingConfig,
}

impl PipelineConfig {
    pub fn new(
        train_root: impl Into<PathBuf>,
        val_root: impl Into<PathBuf>,
        model_path: impl Into<PathBuf>,
        vocab_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            train_root: train_root.into(),
            val_root: val_root.into(),
            model_path: model_path.into(),
            vocab_path: vocab_path.into(),
            clean: false,
            training: TrainingConfig::default(),
        }
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Where the training history is written: `<model stem>_history.json`
    pub fn history_path(&self) -> PathBuf {
        let stem = self
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        self.model_path.with_file_name(format!("{}_history.json", stem))
    }
}

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub cleaning: Vec<ValidationReport>,
    pub model_file: PathBuf,
    pub vocab_file: PathBuf,
    pub history_file: PathBuf,
    pub history: TrainingHistory,
}

/// Clean (optionally), train, then write the model, vocabulary and history
pub fn run_pipeline<B: AutodiffBackend>(
    config: &PipelineConfig,
    device: &B::Device,
) -> Result<PipelineReport> {
    let mut cleaning = Vec::new();
    if config.clean {
        cleaning.push(validate_images(&config.train_root)?);
        cleaning.push(validate_images(&config.val_root)?);
    }

    let outcome = train::<B>(&config.training, &config.train_root, &config.val_root, device)?;

    let model_file = save_model(&outcome.model, &outcome.model_config, &config.model_path)?;
    outcome.vocabulary.save(&config.vocab_path)?;
    let history_file = config.history_path();
    outcome.history.save(&history_file)?;

    info!(
        "Pipeline complete: model {:?}, vocabulary {:?}, history {:?}",
        model_file, config.vocab_path, history_file
    );

    Ok(PipelineReport {
        cleaning,
        model_file,
        vocab_file: config.vocab_path.clone(),
        history_file,
        history: outcome.history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::write_class_tree;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            epochs: 2,
            batch_size: 2,
            image_size: 24,
            hidden_units: 8,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_history_json_is_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        let history = TrainingHistory {
            epochs: vec![EpochReport {
                epoch: 1,
                train_loss: 0.7,
                train_accuracy: 0.5,
                val_loss: 0.69,
                val_accuracy: 0.5,
                train_steps: 3,
                val_steps: 1,
                duration_secs: 1.0,
            }],
        };

        history.save(&path).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.is_array());
        assert_eq!(TrainingHistory::load(&path).unwrap(), history);
        assert_eq!(history.final_val_accuracy(), 0.5);
    }

    #[test]
    fn test_history_path_next_to_model() {
        let config = PipelineConfig::new("train", "val", "out/plant_cnn", "out/classes.json");
        assert_eq!(config.history_path(), PathBuf::from("out/plant_cnn_history.json"));
    }

    #[test]
    fn test_train_records_every_epoch() {
        let temp_dir = TempDir::new().unwrap();
        let train_root = temp_dir.path().join("train");
        let val_root = temp_dir.path().join("val");
        write_class_tree(&train_root, &[("a", [200, 0, 0]), ("b", [0, 0, 200])], 3);
        write_class_tree(&val_root, &[("a", [200, 0, 0]), ("b", [0, 0, 200])], 1);

        let device = Default::default();
        let outcome = train::<TestBackend>(&small_config(), &train_root, &val_root, &device).unwrap();

        assert_eq!(outcome.vocabulary.names(), &["a", "b"]);
        assert_eq!(outcome.history.epochs.len(), 2);
        assert_eq!(outcome.model.num_classes(), 2);
        for (i, report) in outcome.history.epochs.iter().enumerate() {
            assert_eq!(report.epoch, i + 1);
            // 6 training images in batches of 2, 2 validation images in one batch
            assert_eq!(report.train_steps, 3);
            assert_eq!(report.val_steps, 1);
            assert!(report.train_loss.is_finite());
            assert!((0.0..=1.0).contains(&report.val_accuracy));
        }
    }

    #[test]
    fn test_train_fails_fast_without_classes() {
        let temp_dir = TempDir::new().unwrap();
        let train_root = temp_dir.path().join("train");
        let val_root = temp_dir.path().join("val");
        std::fs::create_dir_all(&train_root).unwrap();
        std::fs::create_dir_all(&val_root).unwrap();

        let device = Default::default();
        let err = train::<TestBackend>(&small_config(), &train_root, &val_root, &device)
            .err()
            .unwrap();
        assert!(matches!(err, PlantError::EmptyDataset(_)));
    }

    #[test]
    fn test_train_fails_fast_on_empty_validation() {
        let temp_dir = TempDir::new().unwrap();
        let train_root = temp_dir.path().join("train");
        let val_root = temp_dir.path().join("val");
        write_class_tree(&train_root, &[("a", [200, 0, 0])], 2);
        std::fs::create_dir_all(val_root.join("a")).unwrap();

        let device = Default::default();
        let err = train::<TestBackend>(&small_config(), &train_root, &val_root, &device)
            .err()
            .unwrap();
        assert!(matches!(err, PlantError::EmptyDataset(_)));
    }
}
