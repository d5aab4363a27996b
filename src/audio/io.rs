//! WAV file I/O for Hush
//!
//! Reads WAV files into the 16-bit little-endian PCM byte layout the session
//! consumes, and writes denoised PCM back out as 16-bit WAV.
//!
//! Files with other bit depths or float samples are converted to 16-bit on read.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::audio::pcm::{samples_to_bytes, BYTES_PER_SAMPLE};
use crate::error::{DenoiseError, Result};

/// Interleaved 16-bit PCM together with its format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    /// Little-endian interleaved samples
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    pub fn new(bytes: Vec<u8>, sample_rate: u32, channels: u16) -> Self {
        Self {
            bytes,
            sample_rate,
            channels,
        }
    }

    /// Number of whole frames
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.bytes.len() / (self.channels as usize * BYTES_PER_SAMPLE)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }
}

fn wav_error(reason: &str, e: hound::Error) -> DenoiseError {
    DenoiseError::InvalidAudio {
        reason: format!("{}: {}", reason, e),
        source: Some(Box::new(e)),
    }
}

/// Read a WAV file as 16-bit PCM
///
/// # Errors
/// * `Io` - the file does not exist
/// * `InvalidAudio` - the file is not a readable WAV file or has an unsupported depth
pub fn read_wav(path: &Path) -> Result<PcmAudio> {
    if !path.exists() {
        return Err(DenoiseError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let reader = WavReader::open(path).map_err(|e| wav_error("Failed to open WAV file", e))?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(DenoiseError::InvalidAudio {
            reason: format!(
                "WAV header declares {} channels at {} Hz",
                spec.channels, spec.sample_rate
            ),
            source: None,
        });
    }

    let samples = read_samples_as_i16(reader, spec.bits_per_sample, spec.sample_format)?;

    Ok(PcmAudio::new(
        samples_to_bytes(&samples),
        spec.sample_rate,
        spec.channels,
    ))
}

/// Write 16-bit PCM to a WAV file
///
/// # Errors
/// * `InvalidAudio` - the file cannot be created or written
pub fn write_wav(path: &Path, audio: &PcmAudio) -> Result<()> {
    let spec = WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer =
        WavWriter::create(path, spec).map_err(|e| wav_error("Failed to create WAV file", e))?;

    for pair in audio.bytes.chunks_exact(BYTES_PER_SAMPLE) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .map_err(|e| wav_error("Failed to write sample", e))?;
    }

    writer
        .finalize()
        .map_err(|e| wav_error("Failed to finalize WAV file", e))?;

    Ok(())
}

/// Generate a mono 16-bit sine tone at `amplitude` (0.0 to 1.0)
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> PcmAudio {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    let samples: Vec<i16> = (0..num_samples)
        .map(|i| ((angular_freq * i as f32).sin() * amplitude * 32767.0) as i16)
        .collect();

    PcmAudio::new(samples_to_bytes(&samples), sample_rate, 1)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn read_samples_as_i16<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<i16>> {
    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v * 32767.0).clamp(-32768.0, 32767.0) as i16))
            .collect::<std::result::Result<Vec<i16>, _>>()
            .map_err(|e| wav_error("Failed to read float samples", e)),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| (v as i16) << 8))
            .collect::<std::result::Result<Vec<i16>, _>>()
            .map_err(|e| wav_error("Failed to read 8-bit samples", e)),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<i16>, _>>()
            .map_err(|e| wav_error("Failed to read 16-bit samples", e)),
        (SampleFormat::Int, bits @ (24 | 32)) => {
            let shift = bits - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<std::result::Result<Vec<i16>, _>>()
                .map_err(|e| wav_error("Failed to read wide integer samples", e))
        }
        (SampleFormat::Int, bits) => Err(DenoiseError::InvalidAudio {
            reason: format!("{}-bit integer audio is not supported", bits),
            source: None,
        }),
    }
}
