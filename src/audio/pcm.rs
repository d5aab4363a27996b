//! 16-bit little-endian PCM conversions
//!
//! The session hands the model normalized floats (`i16 / 32767`) and turns the
//! model output back into saturated 16-bit samples.

/// Scale between 16-bit samples and normalized floats
pub const PCM_SCALE: f32 = 32767.0;

/// Bytes per 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Decode little-endian 16-bit samples. A trailing odd byte is ignored.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples as little-endian 16-bit PCM.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Decode PCM bytes into normalized floats (each sample divided by 32767).
pub fn bytes_to_normalized(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
        .collect()
}

/// Convert a normalized float back into a 16-bit sample.
///
/// Truncates toward zero and saturates to the 16-bit range; NaN becomes silence.
#[inline]
pub fn denormalize(sample: f32) -> i16 {
    let scaled = sample * PCM_SCALE;
    if scaled.is_nan() {
        return 0;
    }
    // `as` saturates float-to-int casts
    (scaled as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Encode normalized floats as little-endian 16-bit PCM.
pub fn normalized_to_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        bytes.extend_from_slice(&denormalize(sample).to_le_bytes());
    }
    bytes
}
