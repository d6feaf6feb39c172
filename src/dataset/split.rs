//! Train/validation splitting of a class-per-directory corpus
//!
//! Every class is split on its own so both partitions keep the class balance
//! of the source tree. The split is reproducible for a fixed seed: files are
//! sorted before the seeded shuffle, so the outcome does not depend on the
//! order the filesystem lists them in.

use std::fs;
use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{list_class_dirs, list_images};
use crate::utils::error::{PlantError, Result};

/// Configuration for dataset splitting
///
/// Deserialization goes through [`SplitConfig::new`], so a loaded ratio is
/// checked the same way as one built in code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSplitConfig")]
pub struct SplitConfig {
    /// Fraction of each class copied to the training tree
    ratio: f64,
    /// Shuffle seed; `None` draws one from the OS
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct RawSplitConfig {
    ratio: f64,
    #[serde(default)]
    seed: Option<u64>,
}

impl TryFrom<RawSplitConfig> for SplitConfig {
    type Error = PlantError;

    fn try_from(raw: RawSplitConfig) -> Result<Self> {
        SplitConfig::new(raw.ratio, raw.seed)
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            seed: Some(42),
        }
    }
}

impl SplitConfig {
    /// Create a split configuration
    ///
    /// The ratio must lie strictly between 0 and 1.
    pub fn new(ratio: f64, seed: Option<u64>) -> Result<Self> {
        let config = Self { ratio, seed };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err(PlantError::Config(format!(
                "Split ratio must be strictly between 0.0 and 1.0, got {}",
                self.ratio
            )));
        }
        Ok(())
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Number of files of a class that go to the training tree
    pub fn train_count(&self, total: usize) -> usize {
        ((self.ratio * total as f64).floor() as usize).min(total)
    }
}

/// Per-class result of a split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSplit {
    pub class_name: String,
    pub train: usize,
    pub validation: usize,
}

/// Summary of a split run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitReport {
    pub classes: Vec<ClassSplit>,
}

impl SplitReport {
    pub fn total_train(&self) -> usize {
        self.classes.iter().map(|c| c.train).sum()
    }

    pub fn total_validation(&self) -> usize {
        self.classes.iter().map(|c| c.validation).sum()
    }
}

fn copy_into(files: &[std::path::PathBuf], dest: &Path) -> Result<()> {
    for file in files {
        let name = file
            .file_name()
            .ok_or_else(|| PlantError::Dataset(format!("Invalid file path {:?}", file)))?;
        fs::copy(file, dest.join(name))?;
    }
    Ok(())
}

/// Split every class under `source` into `train_out` and `val_out`
///
/// Files are copied, the source tree is left untouched. Classes are visited in
/// sorted order and share one RNG, so a fixed seed reproduces the same split.
pub fn split_dataset(
    source: &Path,
    train_out: &Path,
    val_out: &Path,
    config: &SplitConfig,
) -> Result<SplitReport> {
    config.validate()?;
    let class_names = list_class_dirs(source)?;

    info!(
        "Splitting {} classes from {:?} (ratio {:.2})",
        class_names.len(),
        source,
        config.ratio
    );

    let mut rng = config.rng();
    let mut report = SplitReport::default();

    for class_name in class_names {
        let mut images = list_images(&source.join(&class_name))?;
        images.shuffle(&mut rng);

        let n_train = config.train_count(images.len());
        let (train, validation) = images.split_at(n_train);

        let train_dir = train_out.join(&class_name);
        let val_dir = val_out.join(&class_name);
        fs::create_dir_all(&train_dir)?;
        fs::create_dir_all(&val_dir)?;

        copy_into(train, &train_dir)?;
        copy_into(validation, &val_dir)?;

        debug!(
            "{}: {} train, {} validation",
            class_name,
            train.len(),
            validation.len()
        );

        report.classes.push(ClassSplit {
            class_name,
            train: train.len(),
            validation: validation.len(),
        });
    }

    info!(
        "Split complete: {} train, {} validation",
        report.total_train(),
        report.total_validation()
    );

    Ok(report)
}
