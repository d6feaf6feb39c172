//! Compute backend used by the `plantcare` binary
//!
//! The library is generic over Burn backends. This module only fixes the
//! concrete pair the CLI runs on: `TrainingBackend` drives `train` and
//! `run_pipeline`, and its inner `DefaultBackend` loads the artifact for
//! `predict`. NdArray on the CPU is the default build; the `cuda` feature swaps
//! both aliases onto the GPU without touching any call site.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn_cuda::Cuda;

#[cfg(all(not(feature = "cuda"), any(feature = "ndarray", feature = "cpu")))]
pub type DefaultBackend = burn_ndarray::NdArray;

#[cfg(all(not(feature = "cuda"), not(feature = "ndarray"), not(feature = "cpu")))]
compile_error!("Enable the `ndarray` (default) or `cuda` feature to pick a backend");

/// Backend of the training loop; `InnerBackend` is [`DefaultBackend`]
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Device shared by training and inference
pub type Device = <DefaultBackend as Backend>::Device;

/// First CPU core for NdArray, GPU 0 for CUDA
pub fn default_device() -> Device {
    Device::default()
}

/// Backend label printed in the CLI banner
pub fn backend_name() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA (GPU)"
    } else {
        "NdArray (CPU)"
    }
}
