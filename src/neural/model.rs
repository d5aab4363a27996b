//! Denoising model trait and core types
//!
//! Defines the capability every noise-suppression backend implements, and the
//! descriptor used to pick which model weights to load.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DenoiseError, Result};

/// Sample rate the model consumes
pub const MODEL_INPUT_SAMPLE_RATE: u32 = 24_000;

/// Sample rate the model produces
pub const MODEL_OUTPUT_SAMPLE_RATE: u32 = 48_000;

/// Number of output samples a model must return for `input_len` input samples.
///
/// Models upsample while they denoise: the output covers the same stretch of
/// time as the input, at `MODEL_OUTPUT_SAMPLE_RATE`.
pub fn expected_output_len(input_len: usize) -> usize {
    (input_len as u64 * MODEL_OUTPUT_SAMPLE_RATE as u64 / MODEL_INPUT_SAMPLE_RATE as u64) as usize
}

/// Selectable model variant
///
/// Only used to find the weights to load; switching type reloads the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Small network, low latency
    #[default]
    SmallFast,
    /// Small network, higher quality
    SmallSlow,
    /// Large network, low latency
    LargeFast,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [Self::SmallFast, Self::SmallSlow, Self::LargeFast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmallFast => "small_fast",
            Self::SmallSlow => "small_slow",
            Self::LargeFast => "large_fast",
        }
    }

    /// File name (without extension) of the weights for this variant
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::SmallFast => "silero_denoise_small_fast",
            Self::SmallSlow => "silero_denoise_small_slow",
            Self::LargeFast => "silero_denoise_large_fast",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SmallFast => "Small model, fastest inference",
            Self::SmallSlow => "Small model, slower but cleaner output",
            Self::LargeFast => "Large model, strongest suppression",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = DenoiseError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized || t.file_stem() == normalized)
            .ok_or_else(|| {
                DenoiseError::invalid_argument(format!(
                    "Unknown model type '{}' (expected one of: small_fast, small_slow, large_fast)",
                    s
                ))
            })
    }
}

/// Trait that all denoising backends implement
///
/// The session only calls these methods while holding its lock, so a model
/// never sees two calls at once.
pub trait DenoiseModel: Send {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Denoise a block of normalized mono samples at `MODEL_INPUT_SAMPLE_RATE`
    ///
    /// # Returns
    /// `expected_output_len(input.len())` normalized samples at
    /// `MODEL_OUTPUT_SAMPLE_RATE`
    ///
    /// # Errors
    /// * `Inference` - any runtime failure
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Clear recurrent state so the next call behaves like a fresh stream
    fn reset(&mut self) -> Result<()>;

    /// Release runtime resources. Called once per loaded instance.
    fn close(&mut self);
}
