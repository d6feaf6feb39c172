//! PlantCare CLI
//!
//! Entry point for dataset preparation, training and single-image prediction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use plantcare::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use plantcare::dataset::{list_class_dirs, list_images, split_dataset, validate_images, SplitConfig};
use plantcare::inference::{DiseaseInfoTable, HealthStatus, InferenceService};
use plantcare::training::{run_pipeline, PipelineConfig, TrainingConfig};
use plantcare::utils::format_duration;
use plantcare::utils::logging::{init_logging, LogConfig};
use plantcare::LabelVocabulary;

/// PlantCare: plant leaf disease classification
#[derive(Parser, Debug)]
#[command(name = "plantcare")]
#[command(version)]
#[command(about = "Plant leaf disease classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Delete every image that cannot be decoded
    Clean {
        /// Dataset root (scanned recursively)
        #[arg(short, long)]
        data_dir: PathBuf,
    },

    /// Split a class-per-directory corpus into train and validation trees
    Split {
        /// Source corpus
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory for the training tree
        #[arg(long, default_value = "data/train")]
        train_out: PathBuf,

        /// Output directory for the validation tree
        #[arg(long, default_value = "data/val")]
        val_out: PathBuf,

        /// Fraction of each class that goes to training
        #[arg(short, long, default_value = "0.8")]
        ratio: f64,

        /// Shuffle seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Ignore the seed and shuffle from OS entropy
        #[arg(long, default_value = "false")]
        random: bool,
    },

    /// Write the label vocabulary of a training tree
    Vocab {
        /// Training tree
        #[arg(short, long)]
        train_dir: PathBuf,

        /// Output JSON file
        #[arg(short, long, default_value = "artifacts/class_names.json")]
        output: PathBuf,
    },

    /// Train the classifier and write the model and vocabulary artifacts
    Train {
        /// Training tree
        #[arg(long, default_value = "data/train")]
        train_dir: PathBuf,

        /// Validation tree
        #[arg(long, default_value = "data/val")]
        val_dir: PathBuf,

        /// Model artifact path (".mpk" is added)
        #[arg(short, long, default_value = "artifacts/plant_cnn")]
        model: PathBuf,

        /// Vocabulary artifact path
        #[arg(long, default_value = "artifacts/class_names.json")]
        vocab: PathBuf,

        /// JSON training configuration; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Remove undecodable images from both trees first
        #[arg(long, default_value = "false")]
        clean: bool,
    },

    /// Classify an image, or every image in a directory
    Predict {
        /// Image file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Model artifact path
        #[arg(short, long, default_value = "artifacts/plant_cnn")]
        model: PathBuf,

        /// Vocabulary artifact path
        #[arg(long, default_value = "artifacts/class_names.json")]
        vocab: PathBuf,
    },

    /// Show per-class image counts of a dataset tree
    Stats {
        /// Dataset root
        #[arg(short, long)]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Clean { data_dir } => cmd_clean(&data_dir),
        Commands::Split {
            source,
            train_out,
            val_out,
            ratio,
            seed,
            random,
        } => cmd_split(&source, &train_out, &val_out, ratio, (!random).then_some(seed)),
        Commands::Vocab { train_dir, output } => cmd_vocab(&train_dir, &output),
        Commands::Train {
            train_dir,
            val_dir,
            model,
            vocab,
            config,
            epochs,
            batch_size,
            learning_rate,
            seed,
            clean,
        } => {
            let mut training = match config {
                Some(path) => TrainingConfig::load(&path)
                    .with_context(|| format!("Failed to load training config {:?}", path))?,
                None => TrainingConfig::default(),
            };
            if let Some(epochs) = epochs {
                training.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                training.batch_size = batch_size;
            }
            if let Some(learning_rate) = learning_rate {
                training.learning_rate = learning_rate;
            }
            if let Some(seed) = seed {
                training.seed = seed;
            }

            let pipeline = PipelineConfig::new(train_dir, val_dir, model, vocab)
                .with_clean(clean)
                .with_training(training);
            cmd_train(&pipeline)
        }
        Commands::Predict {
            input,
            model,
            vocab,
        } => cmd_predict(&input, &model, &vocab),
        Commands::Stats { data_dir } => cmd_stats(&data_dir),
    }
}

fn print_banner() {
    println!();
    println!("{}", "PlantCare · leaf disease classifier".green().bold());
    println!("  Backend: {}  |  v{}", backend_name(), plantcare::VERSION);
    println!();
}

fn cmd_clean(data_dir: &Path) -> Result<()> {
    info!("Cleaning {:?}", data_dir);

    let report = validate_images(data_dir)
        .with_context(|| format!("Failed to clean {:?}", data_dir))?;

    println!("{}", "Cleaning Summary:".cyan().bold());
    println!("  Scanned: {}", report.scanned);
    println!("  Valid:   {}", report.valid());
    println!("  Removed: {}", report.removed.len().to_string().yellow());
    for path in &report.failed_removals {
        println!("  {} could not remove {:?}", "Warning:".yellow(), path);
    }

    Ok(())
}

fn cmd_split(
    source: &Path,
    train_out: &Path,
    val_out: &Path,
    ratio: f64,
    seed: Option<u64>,
) -> Result<()> {
    let config = SplitConfig::new(ratio, seed)?;
    let report = split_dataset(source, train_out, val_out, &config)
        .with_context(|| format!("Failed to split {:?}", source))?;

    println!("{}", "Split Summary:".cyan().bold());
    for class in &report.classes {
        println!(
            "  {:40} {:>6} train {:>6} val",
            class.class_name, class.train, class.validation
        );
    }
    println!(
        "  {:40} {:>6} train {:>6} val",
        "Total",
        report.total_train(),
        report.total_validation()
    );

    Ok(())
}

fn cmd_vocab(train_dir: &Path, output: &Path) -> Result<()> {
    let vocabulary = LabelVocabulary::build(train_dir)
        .with_context(|| format!("Failed to read classes from {:?}", train_dir))?;
    vocabulary.save(output)?;

    println!("{}", "Label Vocabulary:".cyan().bold());
    for (index, name) in vocabulary.names().iter().enumerate() {
        println!("  {:>3}  {}", index, name);
    }
    println!("  Saved to {:?}", output);

    Ok(())
}

fn cmd_train(pipeline: &PipelineConfig) -> Result<()> {
    let training = &pipeline.training;

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Train dir:     {:?}", pipeline.train_root);
    println!("  Val dir:       {:?}", pipeline.val_root);
    println!("  Epochs:        {}", training.epochs);
    println!("  Batch size:    {}", training.batch_size);
    println!("  Learning rate: {}", training.learning_rate);
    println!("  Seed:          {}", training.seed);
    println!();

    let device = default_device();
    let report = run_pipeline::<TrainingBackend>(pipeline, &device).context("Training failed")?;

    for (root, cleaning) in [&pipeline.train_root, &pipeline.val_root]
        .iter()
        .zip(report.cleaning.iter())
    {
        println!("  Cleaned {:?}: removed {}", root, cleaning.removed.len());
    }

    println!();
    println!("{}", "Training Complete!".green().bold());
    for epoch in &report.history.epochs {
        println!(
            "  Epoch {:>3}: loss {:.4} | acc {:>6.2}% | val loss {:.4} | val acc {:>6.2}% | {}",
            epoch.epoch,
            epoch.train_loss,
            epoch.train_accuracy * 100.0,
            epoch.val_loss,
            epoch.val_accuracy * 100.0,
            format_duration(epoch.duration_secs)
        );
    }
    println!();
    println!("  Model:      {:?}", report.model_file);
    println!("  Vocabulary: {:?}", report.vocab_file);
    println!("  History:    {:?}", report.history_file);

    Ok(())
}

fn cmd_predict(input: &Path, model: &Path, vocab: &Path) -> Result<()> {
    let mut service = InferenceService::<DefaultBackend>::new(default_device());
    service
        .load(model, vocab)
        .with_context(|| format!("Failed to load model {:?} with vocabulary {:?}", model, vocab))?;

    let files = if input.is_dir() {
        list_images(input)?
    } else {
        vec![input.to_path_buf()]
    };

    let disease_info = DiseaseInfoTable::default();

    for file in &files {
        let prediction = service
            .classify_path(file)
            .with_context(|| format!("Failed to classify {:?}", file))?;
        let info = disease_info.lookup(&prediction.label);

        let status = match prediction.status {
            HealthStatus::Healthy => prediction.status.to_string().green().bold(),
            HealthStatus::Diseased => prediction.status.to_string().red().bold(),
        };

        println!("{}", format!("{}", file.display()).cyan().bold());
        println!("  Prediction: {}", prediction.display_label());
        println!("  Confidence: {:.2}%", prediction.confidence);
        println!("  Status:     {}", status);
        println!("  Treatment:  {}", info.treatment);
        println!("  Advice:     {}", info.advisory);
        println!();
    }

    Ok(())
}

fn cmd_stats(data_dir: &Path) -> Result<()> {
    let classes = list_class_dirs(data_dir)
        .with_context(|| format!("Failed to read dataset {:?}", data_dir))?;

    let mut counts = Vec::with_capacity(classes.len());
    for class in &classes {
        counts.push(list_images(&data_dir.join(class))?.len());
    }
    let total: usize = counts.iter().sum();

    println!("{}", "Dataset Statistics:".cyan().bold());
    println!("  Classes: {}", classes.len());
    println!("  Images:  {}", total);
    println!();
    println!("{}", "Class Distribution:".cyan().bold());
    for (class, count) in classes.iter().zip(counts.iter()) {
        let pct = 100.0 * *count as f64 / total.max(1) as f64;
        println!("  {:40} {:>6} ({:>5.1}%)", class, count, pct);
    }

    Ok(())
}
