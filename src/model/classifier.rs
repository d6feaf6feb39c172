//! Trainable classifier: the CNN paired with its optimizer
//!
//! Loss is categorical cross-entropy against one-hot targets,
//! `-sum(y * log_softmax(z))` averaged over the batch.

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        activation::log_softmax,
        backend::{AutodiffBackend, Backend},
        ElementConversion, Tensor,
    },
};
use serde::{Deserialize, Serialize};

use super::cnn::PlantCnn;
use crate::dataset::PlantBatch;

/// Loss and accuracy of one batch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepMetrics {
    pub loss: f64,
    /// Fraction of correct predictions in [0, 1]
    pub accuracy: f64,
    pub samples: usize,
}

/// Mean cross-entropy and number of correct argmax predictions
fn batch_metrics<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> (Tensor<B, 1>, usize) {
    let correct: i64 = logits
        .clone()
        .argmax(1)
        .equal(targets.clone().argmax(1))
        .int()
        .sum()
        .into_scalar()
        .elem();

    let loss = (targets * log_softmax(logits, 1)).sum_dim(1).mean().neg();

    (loss, correct.max(0) as usize)
}

/// The CNN plus the optimizer state that trains it
pub struct Classifier<B: AutodiffBackend, O: Optimizer<PlantCnn<B>, B>> {
    model: PlantCnn<B>,
    optimizer: O,
    learning_rate: f64,
}

/// Classifier trained with Adam
pub fn adam_classifier<B: AutodiffBackend>(
    model: PlantCnn<B>,
    learning_rate: f64,
) -> Classifier<B, impl Optimizer<PlantCnn<B>, B>> {
    Classifier::new(model, AdamConfig::new().init::<B, PlantCnn<B>>(), learning_rate)
}

impl<B: AutodiffBackend, O: Optimizer<PlantCnn<B>, B>> Classifier<B, O> {
    pub fn new(model: PlantCnn<B>, optimizer: O, learning_rate: f64) -> Self {
        Self {
            model,
            optimizer,
            learning_rate,
        }
    }

    /// One gradient update on `batch`
    ///
    /// The reported metrics are those of the forward pass before the update.
    pub fn train_step(&mut self, batch: PlantBatch<B>) -> StepMetrics {
        let samples = batch.images.dims()[0];
        let logits = self.model.forward(batch.images);
        let (loss, correct) = batch_metrics(logits, batch.targets);
        let loss_value: f64 = loss.clone().into_scalar().elem();

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        StepMetrics {
            loss: loss_value,
            accuracy: correct as f64 / samples.max(1) as f64,
            samples,
        }
    }

    /// Metrics on `batch` without touching the weights
    ///
    /// Runs on the inner backend, so dropout is disabled.
    pub fn evaluate(&self, batch: PlantBatch<B>) -> StepMetrics {
        let samples = batch.images.dims()[0];
        let model = self.model.valid();
        let logits = model.forward(batch.images.inner());
        let (loss, correct) = batch_metrics(logits, batch.targets.inner());

        StepMetrics {
            loss: loss.into_scalar().elem(),
            accuracy: correct as f64 / samples.max(1) as f64,
            samples,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn model(&self) -> &PlantCnn<B> {
        &self.model
    }

    /// The trained network without autodiff, ready for inference or saving
    pub fn into_inference_model(self) -> PlantCnn<B::InnerBackend> {
        self.model.valid()
    }
}
