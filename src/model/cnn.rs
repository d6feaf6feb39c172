//! CNN architecture for plant disease classification
//!
//! Three unpadded 3×3 convolutions (32, 64 and 128 filters), each followed by
//! ReLU and a 2×2 max pool, then a 128-unit dense layer with dropout and the
//! class head. For a 128×128 input the feature map entering the head is
//! 128 × 14 × 14 = 25088 values.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor, TensorData},
};

use crate::utils::error::PlantError;

/// Filters of the three convolution stages
pub const CONV_FILTERS: [usize; 3] = [32, 64, 128];

const KERNEL_SIZE: usize = 3;

/// Configuration for the PlantCnn model
#[derive(Config, Debug)]
pub struct PlantCnnConfig {
    /// Number of output classes (size of the label vocabulary)
    pub num_classes: usize,

    /// Input image size (square)
    #[config(default = "128")]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Width of the dense layer before the class head
    #[config(default = "128")]
    pub hidden_units: usize,

    /// Dropout rate applied after the dense layer while training
    #[config(default = "0.5")]
    pub dropout: f64,
}

impl PlantCnnConfig {
    /// Side length of the feature map after the last pooling stage
    pub fn feature_map_size(&self) -> usize {
        CONV_FILTERS.iter().fold(self.input_size, |size, _| {
            size.saturating_sub(KERNEL_SIZE - 1) / 2
        })
    }

    /// Number of features entering the dense layer
    pub fn flattened_features(&self) -> usize {
        let side = self.feature_map_size();
        CONV_FILTERS[2] * side * side
    }

    /// Initialize a model with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> PlantCnn<B> {
        let conv = |cin: usize, cout: usize| {
            Conv2dConfig::new([cin, cout], [KERNEL_SIZE, KERNEL_SIZE]).init(device)
        };

        PlantCnn {
            conv1: conv(self.in_channels, CONV_FILTERS[0]),
            conv2: conv(CONV_FILTERS[0], CONV_FILTERS[1]),
            conv3: conv(CONV_FILTERS[1], CONV_FILTERS[2]),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            activation: Relu::new(),
            fc1: LinearConfig::new(self.flattened_features(), self.hidden_units).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc2: LinearConfig::new(self.hidden_units, self.num_classes).init(device),
        }
    }
}

/// Plant disease classifier CNN
#[derive(Module, Debug)]
pub struct PlantCnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub pool: MaxPool2d,
    pub activation: Relu,
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,
}

impl<B: Backend> PlantCnn<B> {
    /// Forward pass returning logits
    ///
    /// # Shapes
    /// - Input: [batch_size, 3, height, width]
    /// - Output: [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.activation.forward(self.conv3.forward(x)));

        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        // Dropout only fires on autodiff backends
        let x = self.dropout.forward(x);

        self.fc2.forward(x)
    }

    /// Class probabilities; every row sums to 1
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Class probabilities for a single preprocessed CHW image
    pub fn predict_probabilities(
        &self,
        pixels: Vec<f32>,
        device: &B::Device,
    ) -> crate::utils::error::Result<Vec<f32>> {
        let side = ((pixels.len() / 3) as f64).sqrt() as usize;
        if pixels.is_empty() || 3 * side * side != pixels.len() {
            return Err(PlantError::Model(format!(
                "Expected a square 3-channel image, got {} values",
                pixels.len()
            )));
        }

        let input = Tensor::<B, 4>::from_floats(TensorData::new(pixels, [1, 3, side, side]), device);
        self.predict(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PlantError::Model(format!("Failed to read probabilities: {:?}", e)))
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.fc2.weight.val().dims()[1]
    }
}
