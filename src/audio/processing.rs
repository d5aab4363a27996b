//! Sample-format transforms on interleaved 16-bit PCM
//!
//! Everything in here is pure: inputs are borrowed, results are new buffers.
//! Sample rate conversion uses linear interpolation, which is what the model
//! front end has always used.

use std::borrow::Cow;

use crate::audio::pcm::{bytes_to_samples, samples_to_bytes, BYTES_PER_SAMPLE};
use crate::error::{DenoiseError, Result};

fn frame_bytes(channels: u16) -> usize {
    channels as usize * BYTES_PER_SAMPLE
}

/// Average interleaved channels into a single channel.
///
/// Each output sample is the truncated integer mean of one frame, saturated
/// to the 16-bit range. Mono input is returned as-is.
///
/// # Errors
/// * `InvalidArgument` - empty input, zero channels, or a length that is not a
///   whole number of frames
pub fn downmix_to_mono(input: &[u8], channels: u16) -> Result<Cow<'_, [u8]>> {
    if input.is_empty() {
        return Err(DenoiseError::invalid_argument("Input data must not be empty"));
    }
    if channels == 0 {
        return Err(DenoiseError::invalid_argument(
            "Number of channels must be greater than 0",
        ));
    }
    if input.len() % frame_bytes(channels) != 0 {
        return Err(DenoiseError::invalid_argument(
            "PCM byte size must be a multiple of the frame size (channels * 2)",
        ));
    }

    if channels == 1 {
        return Ok(Cow::Borrowed(input));
    }

    let samples = bytes_to_samples(input);
    let mono: Vec<i16> = samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i64 = frame.iter().map(|&s| s as i64).sum();
            (sum / channels as i64).clamp(i16::MIN as i64, i16::MAX as i64) as i16
        })
        .collect();

    Ok(Cow::Owned(samples_to_bytes(&mono)))
}

/// Duplicate a mono signal into `channels` interleaved channels.
///
/// # Errors
/// * `InvalidArgument` - zero channels
pub fn upmix_from_mono(mono: &[u8], channels: u16) -> Result<Cow<'_, [u8]>> {
    if channels == 0 {
        return Err(DenoiseError::invalid_argument(
            "Number of channels must be greater than 0",
        ));
    }
    if channels == 1 {
        return Ok(Cow::Borrowed(mono));
    }

    let mut output = Vec::with_capacity(mono.len() * channels as usize);
    for sample in mono.chunks_exact(BYTES_PER_SAMPLE) {
        for _ in 0..channels {
            output.extend_from_slice(sample);
        }
    }
    Ok(Cow::Owned(output))
}

/// Linear interpolation resampling of interleaved 16-bit PCM
///
/// The output holds `floor(frames * output_rate / input_rate)` frames. Output
/// frame `i` reads source position `i * input_rate / output_rate` and blends
/// the two neighbouring source frames; a neighbour past the end repeats the
/// last frame. Bytes beyond the last whole frame are ignored.
///
/// # Errors
/// * `InvalidArgument` - empty input, or zero channels or sample rates
pub fn resample(input: &[u8], channels: u16, input_rate: u32, output_rate: u32) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Err(DenoiseError::invalid_argument("Input data must not be empty"));
    }
    if channels == 0 {
        return Err(DenoiseError::invalid_argument(
            "Number of channels must be greater than 0",
        ));
    }
    if input_rate == 0 {
        return Err(DenoiseError::invalid_argument(
            "Input sample rate must be greater than 0",
        ));
    }
    if output_rate == 0 {
        return Err(DenoiseError::invalid_argument(
            "Output sample rate must be greater than 0",
        ));
    }

    let channels = channels as usize;
    let samples = bytes_to_samples(input);
    let input_frames = input.len() / (channels * BYTES_PER_SAMPLE);
    let output_frames = (input_frames as u64 * output_rate as u64 / input_rate as u64) as usize;

    let step = input_rate as f64 / output_rate as f64;
    let sample_at = |frame: usize, channel: usize| -> Option<f64> {
        (frame < input_frames).then(|| samples[frame * channels + channel] as f64)
    };

    let mut output = Vec::with_capacity(output_frames * channels);
    for i in 0..output_frames {
        let position = i as f64 * step;
        let index = position as usize;
        let fraction = position - index as f64;

        for channel in 0..channels {
            let current = sample_at(index, channel).unwrap_or(0.0);
            let next = sample_at(index + 1, channel).unwrap_or(current);
            // truncates toward zero, same as an integer cast of the blend
            output.push((current + fraction * (next - current)) as i16);
        }
    }

    Ok(samples_to_bytes(&output))
}

/// Resample only when the rates differ; equal rates hand back the input.
pub fn resample_if_needed(
    input: &[u8],
    channels: u16,
    input_rate: u32,
    output_rate: u32,
) -> Result<Cow<'_, [u8]>> {
    if input_rate == output_rate {
        return Ok(Cow::Borrowed(input));
    }
    resample(input, channels, input_rate, output_rate).map(Cow::Owned)
}

/// Linear interpolation resampling of a mono normalized float signal
///
/// Same index mapping and length rule as [`resample`], without quantizing.
/// Zero rates or empty input yield an empty buffer.
pub fn resample_normalized(input: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input.is_empty() || input_rate == 0 || output_rate == 0 {
        return Vec::new();
    }
    if input_rate == output_rate {
        return input.to_vec();
    }

    let output_len = (input.len() as u64 * output_rate as u64 / input_rate as u64) as usize;
    let step = input_rate as f64 / output_rate as f64;

    (0..output_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = position as usize;
            let fraction = (position - index as f64) as f32;
            let current = input.get(index).copied().unwrap_or(0.0);
            let next = input.get(index + 1).copied().unwrap_or(current);
            current + fraction * (next - current)
        })
        .collect()
}

/// Byte count of `millis` milliseconds of 16-bit audio, aligned up to 4 bytes.
///
/// # Errors
/// * `InvalidArgument` - zero sample rate or channels
pub fn calculate_chunk_size(sample_rate: u32, channels: u16, millis: u64) -> Result<usize> {
    if sample_rate == 0 {
        return Err(DenoiseError::invalid_argument(
            "Sample rate must be greater than 0",
        ));
    }
    if channels == 0 {
        return Err(DenoiseError::invalid_argument(
            "Number of channels must be greater than 0",
        ));
    }

    let bytes = (sample_rate as u64)
        .checked_mul(millis)
        .map(|scaled| scaled / 1000)
        .and_then(|frames| frames.checked_mul(BYTES_PER_SAMPLE as u64 * channels as u64))
        .and_then(|bytes| bytes.checked_add(3))
        .map(|bytes| bytes & !3)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or_else(|| {
            DenoiseError::invalid_argument(format!(
                "{} ms at {} Hz x {} channels does not fit in a byte count",
                millis, sample_rate, channels
            ))
        })?;
    Ok(bytes)
}

/// Split a buffer into fixed-size chunks, zero-padding the last one.
///
/// # Errors
/// * `InvalidArgument` - empty input or zero chunk size
pub fn split_into_chunks(input: &[u8], chunk_size: usize) -> Result<Chunks<'_>> {
    if input.is_empty() {
        return Err(DenoiseError::invalid_argument("Input data must not be empty"));
    }
    if chunk_size == 0 {
        return Err(DenoiseError::invalid_argument(
            "Chunk size must be greater than zero",
        ));
    }

    Ok(Chunks {
        input,
        chunk_size,
        offset: 0,
    })
}

/// Lazy iterator over zero-padded chunks of a borrowed buffer
///
/// Each chunk is built on demand. Clone it, or call [`Chunks::rewind`], to
/// walk the buffer again.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    input: &'a [u8],
    chunk_size: usize,
    offset: usize,
}

impl<'a> Chunks<'a> {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Start again from the first chunk.
    pub fn rewind(&mut self) {
        self.offset = 0;
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.input.len() {
            return None;
        }

        let end = (self.offset + self.chunk_size).min(self.input.len());
        let mut chunk = Vec::with_capacity(self.chunk_size);
        chunk.extend_from_slice(&self.input[self.offset..end]);
        chunk.resize(self.chunk_size, 0);
        self.offset = end;

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.input.len().saturating_sub(self.offset);
        let count = remaining.div_ceil(self.chunk_size);
        (count, Some(count))
    }
}

impl<'a> ExactSizeIterator for Chunks<'a> {}
