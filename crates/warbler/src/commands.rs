use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use warblerconf::{ConfigSources, WarblerConfig};

use crate::GenerateArgs;

/// Validate, logging warnings; invalid values abort the command.
fn checked(config: &WarblerConfig) -> Result<()> {
    let warnings = config.validate().context("Invalid configuration")?;
    for warning in warnings {
        warn!("{}", warning);
    }
    Ok(())
}

pub fn preprocess(config: &WarblerConfig) -> Result<()> {
    checked(config)?;

    let report = folkseq::pipeline::preprocess(config).with_context(|| {
        format!(
            "Failed to preprocess {}",
            config.paths.dataset_dir.display()
        )
    })?;

    println!(
        "{} pieces: {} encoded, {} rejected by duration, {} skipped",
        report.loaded, report.accepted, report.rejected, report.failed
    );
    println!("corpus:  {}", config.paths.corpus_file.display());
    println!("mapping: {}", config.paths.mapping_file.display());
    Ok(())
}

pub fn train(config: &WarblerConfig) -> Result<()> {
    checked(config)?;

    let report = folkseq::pipeline::train(config).context("Failed to train model")?;

    println!(
        "{} windows over {} symbols, {} contexts",
        report.windows, report.vocab_size, report.contexts
    );
    println!("model: {}", config.paths.model_file.display());
    Ok(())
}

pub fn generate(mut config: WarblerConfig, args: GenerateArgs) -> Result<()> {
    apply_generate_args(&mut config, args);
    checked(&config)?;

    let mut rng = match config.sampling.rng_seed {
        Some(seed) => {
            info!(seed, "using seeded rng");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let generated =
        folkseq::pipeline::generate(&config, &mut rng).context("Failed to generate melody")?;

    println!("{}", folkseq::join_tokens(&generated.melody));
    println!(
        "{} events written to {}",
        generated.events.len(),
        generated.output.display()
    );
    Ok(())
}

fn apply_generate_args(config: &mut WarblerConfig, args: GenerateArgs) {
    let sampling = &mut config.sampling;
    if let Some(seed) = args.seed {
        sampling.seed = seed;
    }
    if let Some(temperature) = args.temperature {
        sampling.temperature = temperature;
    }
    if let Some(steps) = args.steps {
        sampling.num_steps = steps;
    }
    if let Some(format) = args.format {
        sampling.output_format = format;
    }
    if let Some(seed) = args.rng_seed {
        sampling.rng_seed = Some(seed);
    }
    if let Some(tempo) = args.tempo {
        sampling.tempo_bpm = tempo;
    }
    if let Some(output) = args.output {
        config.paths.output_file = output;
    }
}

pub fn show_config(config: &WarblerConfig, sources: &ConfigSources) {
    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    }
    for path in &sources.files {
        println!("# Loaded: {}", path.display());
    }
    for var in &sources.env_overrides {
        println!("# Env override: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use warblerconf::OutputFormat;

    #[test]
    fn generate_args_override_config() {
        let mut config = WarblerConfig::default();
        let args = GenerateArgs {
            seed: Some("62 _".to_string()),
            temperature: Some(0.5),
            steps: Some(12),
            output: Some(PathBuf::from("out.abc")),
            format: Some(OutputFormat::Abc),
            rng_seed: Some(3),
            tempo: None,
        };
        apply_generate_args(&mut config, args);

        assert_eq!(config.sampling.seed, "62 _");
        assert_eq!(config.sampling.temperature, 0.5);
        assert_eq!(config.sampling.num_steps, 12);
        assert_eq!(config.sampling.output_format, OutputFormat::Abc);
        assert_eq!(config.sampling.rng_seed, Some(3));
        assert_eq!(config.sampling.tempo_bpm, 120);
        assert_eq!(config.paths.output_file, PathBuf::from("out.abc"));
    }

    #[test]
    fn empty_args_leave_config_alone() {
        let mut config = WarblerConfig::default();
        apply_generate_args(&mut config, GenerateArgs::default());
        assert_eq!(config, WarblerConfig::default());
    }
}
