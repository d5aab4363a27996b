//! Audio sample handling
//!
//! - `pcm`: 16-bit PCM byte and normalized float conversions
//! - `processing`: downmix, resampling and chunk framing
//! - `io`: WAV file reading/writing

pub mod io;
pub mod pcm;
pub mod processing;

pub use io::{read_wav, write_wav, PcmAudio};
pub use processing::{
    calculate_chunk_size, downmix_to_mono, resample, resample_if_needed, resample_normalized,
    split_into_chunks, upmix_from_mono, Chunks,
};
