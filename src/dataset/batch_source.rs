//! Batch streaming for training and validation
//!
//! `BatchSource` discovers the labelled images of a class-per-directory tree
//! and yields preprocessed, one-hot labelled batches. Images are decoded
//! lazily, one batch at a time. The stream never ends: after one pass over the
//! data it starts the next one, reshuffling first when in training mode.
//!
//! `PlantBatcher` implements Burn's `Batcher` to turn the prepared samples of
//! a batch into tensors on a device.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::preprocess::{ImageInput, ImagePreprocessor};
use super::vocabulary::LabelVocabulary;
use super::{list_class_dirs, list_images, CHANNELS};
use crate::utils::error::{PlantError, Result};

/// An image file with its ground truth label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledImage {
    /// Path to the image file
    pub path: PathBuf,
    /// Index into the label vocabulary
    pub label: usize,
    /// Class name (parent directory)
    pub class_name: String,
}

/// One preprocessed image and its one-hot target
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSample {
    /// CHW pixels in [0, 1]
    pub pixels: Vec<f32>,
    /// One-hot target, length = number of classes
    pub one_hot: Vec<f32>,
}

/// A batch of prepared samples, in stream order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageBatch {
    pub samples: Vec<PreparedSample>,
}

impl ImageBatch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One-hot encode `label` over `num_classes` positions
pub fn one_hot(label: usize, num_classes: usize) -> Vec<f32> {
    let mut target = vec![0.0f32; num_classes];
    if label < num_classes {
        target[label] = 1.0;
    }
    target
}

/// Endless stream of batches over a class-per-directory tree
pub struct BatchSource {
    samples: Vec<LabeledImage>,
    num_classes: usize,
    batch_size: usize,
    training: bool,
    preprocessor: ImagePreprocessor,
    rng: ChaCha8Rng,
    order: Vec<usize>,
    /// Index of the next batch within the current pass
    cursor: usize,
}

impl std::fmt::Debug for BatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSource")
            .field("samples", &self.samples.len())
            .field("num_classes", &self.num_classes)
            .field("batch_size", &self.batch_size)
            .field("training", &self.training)
            .finish()
    }
}

impl BatchSource {
    /// Discover the samples under `root` for the classes in `vocabulary`
    ///
    /// Classes are visited in vocabulary order and files in name order. A
    /// vocabulary class without a directory contributes no samples; a
    /// directory that is not in the vocabulary is skipped.
    pub fn new(
        root: &Path,
        vocabulary: &LabelVocabulary,
        batch_size: usize,
        training: bool,
        seed: Option<u64>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(PlantError::Config("Batch size must be greater than 0".to_string()));
        }

        for dir in list_class_dirs(root)? {
            if vocabulary.index_of(&dir).is_none() {
                warn!("Skipping class directory {:?}: not in the label vocabulary", dir);
            }
        }

        let mut samples = Vec::new();
        for (label, class_name) in vocabulary.names().iter().enumerate() {
            let class_dir = root.join(class_name);
            if !class_dir.is_dir() {
                debug!("No directory for class {} under {:?}", class_name, root);
                continue;
            }

            let images = list_images(&class_dir)?;
            debug!("{}: {} images", class_name, images.len());
            samples.extend(images.into_iter().map(|path| LabeledImage {
                path,
                label,
                class_name: class_name.clone(),
            }));
        }

        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            order: (0..samples.len()).collect(),
            samples,
            num_classes: vocabulary.len(),
            batch_size,
            training,
            preprocessor: ImagePreprocessor::default(),
            rng,
            cursor: 0,
        })
    }

    /// Replace the preprocessor, e.g. to change the image size
    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn samples(&self) -> &[LabeledImage] {
        &self.samples
    }

    pub fn image_size(&self) -> usize {
        self.preprocessor.image_size()
    }

    /// Samples per yielded batch
    ///
    /// Equal to the configured batch size, except when there are fewer
    /// samples than that: the whole set then forms a single batch.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.min(self.samples.len())
    }

    /// Batches per pass over the data; the remainder is dropped
    pub fn steps_per_epoch(&self) -> usize {
        match self.effective_batch_size() {
            0 => 0,
            size => self.samples.len() / size,
        }
    }

    fn prepare(&mut self, index: usize) -> Result<PreparedSample> {
        let sample = &self.samples[index];
        let pixels = self.preprocessor.preprocess(
            ImageInput::Path(&sample.path),
            self.training,
            &mut self.rng,
        )?;

        Ok(PreparedSample {
            pixels,
            one_hot: one_hot(sample.label, self.num_classes),
        })
    }
}

impl Iterator for BatchSource {
    type Item = Result<ImageBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let steps = self.steps_per_epoch();
        if steps == 0 {
            return None;
        }

        if self.cursor == 0 && self.training {
            self.order.shuffle(&mut self.rng);
        }

        let size = self.effective_batch_size();
        let start = self.cursor * size;
        self.cursor = (self.cursor + 1) % steps;

        let indices: Vec<usize> = self.order[start..start + size].to_vec();
        let mut samples = Vec::with_capacity(size);
        for index in indices {
            match self.prepare(index) {
                Ok(sample) => samples.push(sample),
                Err(e) => return Some(Err(e)),
            }
        }

        Some(Ok(ImageBatch { samples }))
    }
}

/// A batch of images on a device
#[derive(Clone, Debug)]
pub struct PlantBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// One-hot targets with shape [batch_size, num_classes]
    pub targets: Tensor<B, 2>,
}

/// Batcher turning prepared samples into `PlantBatch` tensors
#[derive(Clone, Debug)]
pub struct PlantBatcher<B: Backend> {
    image_size: usize,
    num_classes: usize,
    _backend: PhantomData<B>,
}

impl<B: Backend> PlantBatcher<B> {
    pub fn new(image_size: usize, num_classes: usize) -> Self {
        Self {
            image_size,
            num_classes,
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, PreparedSample, PlantBatch<B>> for PlantBatcher<B> {
    fn batch(&self, items: Vec<PreparedSample>, device: &B::Device) -> PlantBatch<B> {
        let batch_size = items.len();

        let mut images_data =
            Vec::with_capacity(batch_size * CHANNELS * self.image_size * self.image_size);
        let mut targets_data = Vec::with_capacity(batch_size * self.num_classes);
        for item in items {
            images_data.extend(item.pixels);
            targets_data.extend(item.one_hot);
        }

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(
                images_data,
                [batch_size, CHANNELS, self.image_size, self.image_size],
            ),
            device,
        );
        let targets = Tensor::<B, 2>::from_floats(
            TensorData::new(targets_data, [batch_size, self.num_classes]),
            device,
        );

        PlantBatch { images, targets }
    }
}
