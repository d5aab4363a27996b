//! Hush - Streaming PCM Noise Reduction
//!
//! Hush runs chunks of 16-bit little-endian PCM through a neural
//! noise-suppression model and hands back cleaned PCM in the caller's format.
//!
//! # Architecture
//!
//! - `audio`: PCM conversion, channel mixing, resampling and chunking
//! - `neural`: the model capability, model descriptors and loaders
//! - `session`: `DenoisingSession`, which owns one model and serializes every
//!   call into it
//!
//! ```no_run
//! use hush::{DenoisingSession, BundledLoader, ModelType};
//!
//! let session = DenoisingSession::new(BundledLoader, ModelType::SmallFast)?;
//! let chunk = vec![0u8; DenoisingSession::minimum_input_size(16000, 1)?];
//! let cleaned = session.process(&chunk, 16000, 1)?;
//! assert_eq!(cleaned.len(), chunk.len());
//! # Ok::<(), hush::DenoiseError>(())
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod neural;
pub mod session;

#[cfg(feature = "async-bridge")]
pub mod bridge;

pub use config::DenoiseConfig;
pub use error::{DenoiseError, Result};
pub use neural::{BundledLoader, DenoiseModel, FileModelLoader, ModelLoader, ModelType};
pub use session::{DenoisingSession, MINIMUM_CHUNK_MILLIS};

#[cfg(feature = "async-bridge")]
pub use bridge::AsyncSession;
