//! Pass-through backend
//!
//! Performs no suppression: the input is only upsampled to the model output
//! rate. Useful as a bypass and as a reference for the session pipeline.

use super::model::{DenoiseModel, MODEL_INPUT_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE};
use crate::audio::processing::resample_normalized;
use crate::error::{DenoiseError, Result};

#[derive(Debug, Default)]
pub struct PassthroughModel {
    closed: bool,
}

impl PassthroughModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DenoiseModel for PassthroughModel {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if self.closed {
            return Err(DenoiseError::inference("Pass-through model has been closed"));
        }
        Ok(resample_normalized(
            input,
            MODEL_INPUT_SAMPLE_RATE,
            MODEL_OUTPUT_SAMPLE_RATE,
        ))
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
