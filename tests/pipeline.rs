//! End-to-end pipeline: split a tiny corpus, train one epoch, classify an image

use std::fs;
use std::path::Path;

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use image::{ImageBuffer, Rgb};
use tempfile::TempDir;

use plantcare::dataset::{split_dataset, validate_images, BatchSource, LabelVocabulary, SplitConfig};
use plantcare::inference::{HealthStatus, InferenceService};
use plantcare::training::{run_pipeline, PipelineConfig, TrainingConfig};
use plantcare::PlantError;

type Backend = NdArray;
type TrainBackend = Autodiff<NdArray>;

fn create_test_image(path: &Path, color: [u8; 3]) {
    let img = ImageBuffer::from_fn(32, 32, |x, y| {
        if (x + y) % 7 == 0 {
            Rgb([255u8, 255, 255])
        } else {
            Rgb(color)
        }
    });
    img.save(path).unwrap();
}

/// 2 classes × 10 images, plus one corrupt file per class
fn create_corpus(root: &Path) {
    for (class, color) in [("classA", [200u8, 30, 30]), ("classB", [30u8, 30, 200])] {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..10 {
            create_test_image(&dir.join(format!("leaf_{:02}.png", i)), color);
        }
        fs::write(dir.join("corrupt.jpg"), b"truncated upload").unwrap();
    }
}

#[test]
fn test_split_train_and_classify() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw");
    let train_root = temp_dir.path().join("train");
    let val_root = temp_dir.path().join("val");
    let artifacts = temp_dir.path().join("artifacts");
    create_corpus(&raw);

    let cleaned = validate_images(&raw).unwrap();
    assert_eq!(cleaned.removed.len(), 2);

    let split = split_dataset(&raw, &train_root, &val_root, &SplitConfig::default()).unwrap();
    for class in &split.classes {
        assert_eq!((class.train, class.validation), (8, 2));
    }

    let vocabulary = LabelVocabulary::build(&train_root).unwrap();
    assert_eq!(vocabulary.names(), &["classA", "classB"]);

    let training = TrainingConfig {
        epochs: 1,
        batch_size: 4,
        ..TrainingConfig::default()
    };
    let source = BatchSource::new(&train_root, &vocabulary, training.batch_size, true, Some(1)).unwrap();
    assert_eq!(source.steps_per_epoch(), 4);

    let pipeline = PipelineConfig::new(
        &train_root,
        &val_root,
        artifacts.join("plant_cnn"),
        artifacts.join("class_names.json"),
    )
    .with_training(training);

    let report = run_pipeline::<TrainBackend>(&pipeline, &Default::default()).unwrap();
    assert_eq!(report.history.epochs.len(), 1);
    assert_eq!(report.history.epochs[0].train_steps, 4);
    assert_eq!(report.history.epochs[0].val_steps, 1);
    assert!(report.model_file.exists());
    assert!(report.history_file.exists());
    assert_eq!(
        LabelVocabulary::load(&report.vocab_file).unwrap(),
        vocabulary
    );

    let mut service = InferenceService::<Backend>::new(Default::default());
    service.load(&pipeline.model_path, &pipeline.vocab_path).unwrap();

    let image = val_root.join("classA").read_dir().unwrap().next().unwrap().unwrap().path();
    let prediction = service.classify_path(&image).unwrap();

    assert!(["classA", "classB"].contains(&prediction.label.as_str()));
    assert!((0.0..=100.0).contains(&prediction.confidence));
    assert_eq!(prediction.status, HealthStatus::Diseased);
}

#[test]
fn test_vocabulary_model_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw");
    let train_root = temp_dir.path().join("train");
    let val_root = temp_dir.path().join("val");
    create_corpus(&raw);
    validate_images(&raw).unwrap();
    split_dataset(&raw, &train_root, &val_root, &SplitConfig::default()).unwrap();

    let pipeline = PipelineConfig::new(
        &train_root,
        &val_root,
        temp_dir.path().join("model"),
        temp_dir.path().join("classes.json"),
    )
    .with_training(TrainingConfig {
        epochs: 1,
        batch_size: 8,
        image_size: 32,
        ..TrainingConfig::default()
    });
    run_pipeline::<TrainBackend>(&pipeline, &Default::default()).unwrap();

    let three = LabelVocabulary::from_names(vec![
        "classA".to_string(),
        "classB".to_string(),
        "classC".to_string(),
    ])
    .unwrap();
    let wrong_vocab = temp_dir.path().join("three.json");
    three.save(&wrong_vocab).unwrap();

    let mut service = InferenceService::<Backend>::new(Default::default());
    let err = service.load(&pipeline.model_path, &wrong_vocab).unwrap_err();
    assert!(matches!(
        err,
        PlantError::ArtifactMismatch {
            expected: 3,
            found: 2
        }
    ));
    assert!(!service.is_ready());

    let err = service.classify_path(&raw.join("classA/leaf_00.png")).unwrap_err();
    assert!(matches!(err, PlantError::ServiceNotReady));
}
