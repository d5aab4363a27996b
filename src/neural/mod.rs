//! Denoising model interfaces and implementations
//!
//! This module provides:
//! - `DenoiseModel` trait for all noise-suppression backends
//! - `ModelType` descriptors and `ModelLoader` factories
//! - RNNoise and pass-through backends
//! - Mock implementations for testing

pub mod loader;
pub mod mock;
mod model;
mod passthrough;
mod rnnoise;

pub use loader::{discover_models, BundledLoader, FileModelLoader, FnLoader, ModelLoader};
pub use model::{
    expected_output_len, DenoiseModel, ModelType, MODEL_INPUT_SAMPLE_RATE,
    MODEL_OUTPUT_SAMPLE_RATE,
};
pub use passthrough::PassthroughModel;
pub use rnnoise::RnnoiseModel;
