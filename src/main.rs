//! Hush CLI - Streaming Noise Reduction
//!
//! Command-line interface for the Hush denoising library.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hush::cli::{commands, Cli, Commands};
use hush::DenoiseConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    info!("Hush v{}", env!("CARGO_PKG_VERSION"));

    let config = DenoiseConfig::resolve(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("Hush v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &DenoiseConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Denoise {
            input,
            output,
            model,
            chunk_millis,
        } => commands::denoise(&input, &output, model, chunk_millis, config)
            .with_context(|| format!("denoising {}", input.display())),
        Commands::Sizes {
            sample_rate,
            channels,
            millis,
        } => Ok(commands::sizes(sample_rate, channels, millis)?),
        Commands::Models { dir } => Ok(commands::models(dir.as_deref(), config)?),
    }
}
