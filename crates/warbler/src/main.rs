//! warbler - learn folk melodies from ABC tunes and sample new ones
//!
//! Subcommands:
//! - `warbler preprocess` - Filter, transpose and encode the dataset into a corpus
//! - `warbler train` - Fit the n-gram model on the corpus windows
//! - `warbler generate` - Sample a melody and write it as MIDI or ABC
//! - `warbler config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use warblerconf::{OutputFormat, WarblerConfig};

mod commands;

#[derive(Parser)]
#[command(name = "warbler")]
#[command(about = "Folk melody encoding, training and sampling")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./warbler.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode the dataset into the corpus and vocabulary mapping
    Preprocess,

    /// Train the model on the preprocessed corpus
    Train,

    /// Sample a new melody from the trained model
    Generate(GenerateArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Default)]
pub struct GenerateArgs {
    /// Seed tokens, e.g. "60 _ _ _ 62 _"
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Sampling temperature (> 0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Maximum number of sampled steps
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,

    /// Output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: midi or abc
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Seed for the random number generator, for reproducible output
    #[arg(long)]
    pub rng_seed: Option<u64>,

    /// Playback tempo in beats per minute
    #[arg(long)]
    pub tempo: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = WarblerConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    for path in &sources.files {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    for var in &sources.env_overrides {
        tracing::debug!(var = %var, "config overridden from environment");
    }

    match cli.command {
        Commands::Preprocess => commands::preprocess(&config)?,
        Commands::Train => commands::train(&config)?,
        Commands::Generate(args) => commands::generate(config, args)?,
        Commands::Config => commands::show_config(&config, &sources),
    }

    Ok(())
}
