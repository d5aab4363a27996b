//! RNNoise backend
//!
//! Runs the `nnnoiseless` port of RNNoise, which works natively at 48kHz on
//! 480-sample frames with samples in the 16-bit range. Input is upsampled from
//! the model input rate before denoising, so the output lands directly at the
//! model output rate.

use nnnoiseless::DenoiseState;

use super::model::{DenoiseModel, MODEL_INPUT_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE};
use crate::audio::pcm::PCM_SCALE;
use crate::audio::processing::resample_normalized;
use crate::error::{DenoiseError, Result};

const FRAME_SIZE: usize = DenoiseState::FRAME_SIZE;

/// RNNoise model with its recurrent state
pub struct RnnoiseModel {
    state: Option<Box<DenoiseState<'static>>>,
    frame_in: Vec<f32>,
    frame_out: Vec<f32>,
}

impl RnnoiseModel {
    pub fn new() -> Self {
        Self {
            state: Some(DenoiseState::new()),
            frame_in: vec![0.0; FRAME_SIZE],
            frame_out: vec![0.0; FRAME_SIZE],
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }
}

impl Default for RnnoiseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DenoiseModel for RnnoiseModel {
    fn name(&self) -> &str {
        "rnnoise"
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| DenoiseError::inference("RNNoise model has been closed"))?;

        let upsampled = resample_normalized(input, MODEL_INPUT_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE);
        let mut output = Vec::with_capacity(upsampled.len());

        // last frame is zero-padded; its padding is dropped from the output
        for block in upsampled.chunks(FRAME_SIZE) {
            self.frame_in.fill(0.0);
            for (dst, src) in self.frame_in.iter_mut().zip(block) {
                *dst = src * PCM_SCALE;
            }

            state.process_frame(&mut self.frame_out, &self.frame_in);

            output.extend(self.frame_out[..block.len()].iter().map(|s| s / PCM_SCALE));
        }

        Ok(output)
    }

    fn reset(&mut self) -> Result<()> {
        // one second of silence flushes the recurrent state
        let silence = vec![0.0; MODEL_INPUT_SAMPLE_RATE as usize];
        self.process(&silence).map(|_| ())
    }

    fn close(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::model::expected_output_len;

    #[test]
    fn test_output_length_matches_contract() {
        let mut model = RnnoiseModel::new();

        for len in [0, 1, 240, 241, 1000] {
            let output = model.process(&vec![0.0; len]).unwrap();
            assert_eq!(output.len(), expected_output_len(len));
        }
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut model = RnnoiseModel::new();
        let output = model.process(&vec![0.0; 2400]).unwrap();

        assert!(output.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_reset_keeps_model_usable() {
        let mut model = RnnoiseModel::new();
        model.process(&vec![0.1; 480]).unwrap();

        model.reset().unwrap();

        assert_eq!(model.process(&vec![0.0; 480]).unwrap().len(), 960);
    }

    #[test]
    fn test_process_after_close_fails() {
        let mut model = RnnoiseModel::new();
        model.close();

        assert!(model.is_closed());
        let err = model.process(&[0.0; 16]).unwrap_err();
        assert!(matches!(err, DenoiseError::Inference { .. }));
    }
}
