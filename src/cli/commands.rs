//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use tracing::info;

use crate::audio::pcm::BYTES_PER_SAMPLE;
use crate::audio::{read_wav, split_into_chunks, write_wav, PcmAudio};
use crate::config::DenoiseConfig;
use crate::error::Result;
use crate::neural::{discover_models, ModelType};
use crate::session::{DenoisingSession, MINIMUM_CHUNK_MILLIS};

/// Chunk size in bytes for `millis` of audio, rounded up to whole frames.
pub fn chunk_bytes(sample_rate: u32, channels: u16, millis: u64) -> Result<usize> {
    let frame = channels as usize * BYTES_PER_SAMPLE;
    let bytes = DenoisingSession::input_size_for_millis(sample_rate, channels, millis)?;
    Ok(bytes.div_ceil(frame) * frame)
}

/// Denoise `audio` with `session`, one chunk at a time.
///
/// Resampling through the model rates can drop a trailing frame, so each
/// chunk's output is fitted back to the chunk length before the next one is
/// appended; chunk `n` always starts at byte `n * chunk_size`. The result has
/// exactly as many bytes as the input.
pub fn denoise_pcm(session: &DenoisingSession, audio: &PcmAudio, chunk_millis: u64) -> Result<PcmAudio> {
    if audio.bytes.is_empty() {
        return Ok(PcmAudio::new(Vec::new(), audio.sample_rate, audio.channels));
    }

    let chunk_size = chunk_bytes(audio.sample_rate, audio.channels, chunk_millis)?;
    let chunks = split_into_chunks(&audio.bytes, chunk_size)?;
    let total = chunks.len();

    let mut output = Vec::with_capacity(audio.bytes.len() + chunk_size);
    for (i, chunk) in chunks.enumerate() {
        let mut denoised = session.process(&chunk, audio.sample_rate, audio.channels)?;
        denoised.resize(chunk.len(), 0);
        output.extend(denoised);
        tracing::debug!(chunk = i + 1, total, "Chunk denoised");
    }
    output.resize(audio.bytes.len(), 0);

    Ok(PcmAudio::new(output, audio.sample_rate, audio.channels))
}

/// Denoise a WAV file.
pub fn denoise(
    input: &Path,
    output: &Path,
    model: Option<ModelType>,
    chunk_millis: Option<u64>,
    config: &DenoiseConfig,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(model) = model {
        config.model_type = model;
    }
    if let Some(millis) = chunk_millis {
        config.chunk_millis = millis;
    }
    config.validate()?;

    info!("Denoising {} with {}", input.display(), config.model_type);

    let audio = read_wav(input)?;
    let session = DenoisingSession::from_config(&config)?;
    let denoised = denoise_pcm(&session, &audio, config.chunk_millis)?;
    session.close();

    write_wav(output, &denoised)?;

    println!(
        "Denoised {:.2}s of audio ({} Hz, {} ch) -> {}",
        audio.duration_secs(),
        audio.sample_rate,
        audio.channels,
        output.display()
    );

    Ok(())
}

/// Print the input sizes a session expects for a PCM format.
pub fn sizes(sample_rate: u32, channels: u16, millis: Option<u64>) -> Result<()> {
    let minimum = DenoisingSession::minimum_input_size(sample_rate, channels)?;

    println!("Format: {} Hz, {} channel(s), 16-bit", sample_rate, channels);
    println!("Minimum input ({} ms): {} bytes", MINIMUM_CHUNK_MILLIS, minimum);

    if let Some(millis) = millis {
        let size = DenoisingSession::input_size_for_millis(sample_rate, channels, millis)?;
        println!("Input for {} ms: {} bytes", millis, size);
    }

    Ok(())
}

/// List model variants, marking those with weights in the model directory.
pub fn models(dir: Option<&Path>, config: &DenoiseConfig) -> Result<()> {
    let dir = dir.or(config.model_dir.as_deref());
    let available = match dir {
        Some(dir) => discover_models(dir, &config.model_extension),
        None => Vec::new(),
    };

    println!("Model variants:");
    println!("{:-<60}", "");
    for model_type in ModelType::ALL {
        let marker = if available.contains(&model_type) {
            "[x]"
        } else {
            "[ ]"
        };
        let default = if model_type == config.model_type {
            " (configured)"
        } else {
            ""
        };
        println!(
            "{} {:<12} {}{}",
            marker,
            model_type.as_str(),
            model_type.description(),
            default
        );
    }
    println!("{:-<60}", "");

    match dir {
        Some(dir) => println!(
            "{} of {} weight files found in {}",
            available.len(),
            ModelType::ALL.len(),
            dir.display()
        ),
        None => println!("No model directory configured; bundled RNNoise weights are used"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::{bytes_to_samples, samples_to_bytes};
    use crate::neural::PassthroughModel;

    #[test]
    fn test_chunk_bytes_whole_frames() {
        // 3 channels * 2 bytes does not divide the 4-byte aligned size
        let size = chunk_bytes(8000, 3, 1000).unwrap();
        assert_eq!(size % 6, 0);
        assert!(size >= 48000);

        assert_eq!(chunk_bytes(16000, 1, 2500).unwrap(), 96000);
    }

    #[test]
    fn test_denoise_pcm_keeps_length() {
        let session = DenoisingSession::with_model(Box::new(PassthroughModel::new()));
        // 1.5 chunks of stereo audio at 24 kHz
        let samples: Vec<i16> = (0..72000).map(|i| (i % 100) as i16).collect();
        let audio = PcmAudio::new(samples_to_bytes(&samples), 24000, 2);

        let denoised = denoise_pcm(&session, &audio, 1000).unwrap();

        assert_eq!(denoised.bytes.len(), audio.bytes.len());
        assert_eq!(denoised.sample_rate, 24000);
        assert_eq!(denoised.channels, 2);
    }

    #[test]
    fn test_chunks_stay_aligned_when_padding_is_lost() {
        // 11025 Hz mono: 1000 ms is 22050 bytes, aligned up to 22052, and the
        // 24k/48k round trip returns one frame less than went in
        let chunk = chunk_bytes(11025, 1, 1000).unwrap();
        assert_eq!(chunk, 22052);
        let frames = chunk / 2;

        // silent first chunk, then a constant level from the second chunk on
        let mut samples = vec![0i16; frames];
        samples.extend(std::iter::repeat(10_000i16).take(frames * 2));
        let audio = PcmAudio::new(samples_to_bytes(&samples), 11025, 1);

        let session = DenoisingSession::with_model(Box::new(PassthroughModel::new()));
        let denoised = denoise_pcm(&session, &audio, 1000).unwrap();
        let output = bytes_to_samples(&denoised.bytes);

        assert_eq!(output.len(), samples.len());
        // the dropped frame is filled at the end of its own chunk
        assert_eq!(output[frames - 1], 0);
        assert!(output[frames..frames + 100]
            .iter()
            .all(|&s| (9_999..=10_000).contains(&s)));
        assert!(output[2 * frames..2 * frames + 100]
            .iter()
            .all(|&s| (9_999..=10_000).contains(&s)));
    }

    #[test]
    fn test_denoise_pcm_empty() {
        let session = DenoisingSession::with_model(Box::new(PassthroughModel::new()));
        let audio = PcmAudio::new(Vec::new(), 16000, 1);

        assert!(denoise_pcm(&session, &audio, 1000).unwrap().bytes.is_empty());
    }
}
