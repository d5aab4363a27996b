//! CLI Module
//!
//! Command-line interface for denoising WAV files and inspecting session sizing.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::neural::ModelType;

/// Hush - streaming noise reduction for 16-bit PCM audio
#[derive(Parser, Debug)]
#[command(name = "hush")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON config file (HUSH_* environment variables still apply on top)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Denoise a WAV file chunk by chunk
    #[command(name = "denoise")]
    Denoise {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file (16-bit, same rate and channels as the input)
        output: PathBuf,

        /// Model variant (small_fast, small_slow, large_fast)
        #[arg(short, long)]
        model: Option<ModelType>,

        /// Chunk length in milliseconds
        #[arg(long)]
        chunk_millis: Option<u64>,
    },

    /// Print input buffer sizes for a PCM format
    #[command(name = "sizes")]
    Sizes {
        /// Sample rate in Hz
        #[arg(short = 'r', long)]
        sample_rate: u32,

        /// Channel count
        #[arg(short = 'n', long, default_value_t = 1)]
        channels: u16,

        /// Also size a buffer for this many milliseconds
        #[arg(short, long)]
        millis: Option<u64>,
    },

    /// List model variants and which weight files are present
    #[command(name = "models")]
    Models {
        /// Directory to scan for weight files (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}
