//! Layered configuration for warbler.
//!
//! Every stage of the melody pipeline (preprocess, train, generate) reads
//! its settings from one [`WarblerConfig`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use warblerconf::WarblerConfig;
//!
//! let config = WarblerConfig::load().expect("Failed to load config");
//! println!("Dataset: {}", config.paths.dataset_dir.display());
//! println!("Window: {}", config.encoding.sequence_length);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/warbler/config.toml` (system)
//! 2. `~/.config/warbler/config.toml` (user)
//! 3. `./warbler.toml` (local override) or the path given with `--config`
//! 4. Environment variables (`WARBLER_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! dataset_dir = "~/music/folk"
//! output_file = "generated/tune.abc"
//!
//! [encoding]
//! sequence_length = 64
//! skip_failed_pieces = true
//!
//! [sampling]
//! temperature = 0.7
//! num_steps = 300
//! rng_seed = 42
//! output_format = "abc"
//!
//! [model]
//! order = 8
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{
    EncodingConfig, ModelConfig, OutputFormat, PathsConfig, SamplingConfig, TelemetryConfig,
};

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration value {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Complete warbler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WarblerConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub encoding: EncodingConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl WarblerConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/warbler/config.toml`
    /// 3. `~/.config/warbler/config.toml`
    /// 4. `./warbler.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` replacing `./warbler.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    ///
    /// An explicit `config_path` that does not exist is an error.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let origin = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let mut config = loader::config_from_table(merged, &origin)?;

        loader::apply_env_overrides(&mut config, &mut sources)?;

        Ok((config, sources))
    }

    /// Parse a single TOML document on top of the defaults (no discovery, no env).
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let origin = Path::new("<string>");
        let table: toml::Table =
            contents
                .parse()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path: origin.to_path_buf(),
                    message: e.to_string(),
                })?;
        loader::config_from_table(table, origin)
    }

    /// Check value ranges.
    ///
    /// Returns warnings for settings that are legal but probably unintended.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let invalid = |field: &str, message: &str| ConfigError::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        };

        let encoding = &self.encoding;
        if !(encoding.time_step > 0.0) {
            return Err(invalid("encoding.time_step", "must be greater than 0"));
        }
        if encoding.sequence_length == 0 {
            return Err(invalid("encoding.sequence_length", "must be at least 1"));
        }
        if encoding.accepted_durations.is_empty() {
            return Err(invalid("encoding.accepted_durations", "must not be empty"));
        }
        if encoding.accepted_durations.iter().any(|d| !(*d > 0.0)) {
            return Err(invalid("encoding.accepted_durations", "durations must be positive"));
        }
        if encoding.file_extension.is_empty() {
            return Err(invalid("encoding.file_extension", "must not be empty"));
        }

        let sampling = &self.sampling;
        if !(sampling.temperature > 0.0) {
            return Err(invalid("sampling.temperature", "must be greater than 0"));
        }
        if !(sampling.step_duration > 0.0) {
            return Err(invalid("sampling.step_duration", "must be greater than 0"));
        }
        if sampling.tempo_bpm == 0 {
            return Err(invalid("sampling.tempo_bpm", "must be at least 1"));
        }

        if self.model.order == 0 {
            return Err(invalid("model.order", "must be at least 1"));
        }
        if !(self.model.smoothing > 0.0) {
            return Err(invalid("model.smoothing", "must be greater than 0"));
        }

        let mut warnings = Vec::new();
        if (sampling.step_duration - encoding.time_step).abs() > f64::EPSILON {
            warnings.push(format!(
                "sampling.step_duration ({}) differs from encoding.time_step ({}); \
                 generated melodies will play at a different speed than the corpus",
                sampling.step_duration, encoding.time_step
            ));
        }
        if self.model.order > encoding.sequence_length {
            warnings.push(format!(
                "model.order ({}) exceeds encoding.sequence_length ({}); contexts are capped at the window",
                self.model.order, encoding.sequence_length
            ));
        }

        Ok(warnings)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();
        let quoted = |s: &str| toml::Value::String(s.to_string()).to_string();
        let path = |p: &Path| quoted(&p.to_string_lossy());

        output.push_str("# Warbler Configuration\n\n");

        let _ = writeln!(output, "[paths]");
        let _ = writeln!(output, "dataset_dir = {}", path(&self.paths.dataset_dir));
        let _ = writeln!(output, "encoded_dir = {}", path(&self.paths.encoded_dir));
        let _ = writeln!(output, "corpus_file = {}", path(&self.paths.corpus_file));
        let _ = writeln!(output, "mapping_file = {}", path(&self.paths.mapping_file));
        let _ = writeln!(output, "model_file = {}", path(&self.paths.model_file));
        let _ = writeln!(output, "output_file = {}", path(&self.paths.output_file));

        let _ = writeln!(output, "\n[encoding]");
        let _ = writeln!(output, "time_step = {:?}", self.encoding.time_step);
        let _ = writeln!(output, "sequence_length = {}", self.encoding.sequence_length);
        let durations: Vec<String> = self
            .encoding
            .accepted_durations
            .iter()
            .map(|d| format!("{:?}", d))
            .collect();
        let _ = writeln!(output, "accepted_durations = [{}]", durations.join(", "));
        let _ = writeln!(output, "file_extension = {}", quoted(&self.encoding.file_extension));
        let _ = writeln!(output, "skip_failed_pieces = {}", self.encoding.skip_failed_pieces);

        let _ = writeln!(output, "\n[sampling]");
        let _ = writeln!(output, "seed = {}", quoted(&self.sampling.seed));
        let _ = writeln!(output, "num_steps = {}", self.sampling.num_steps);
        let _ = writeln!(output, "temperature = {:?}", self.sampling.temperature);
        let _ = writeln!(output, "step_duration = {:?}", self.sampling.step_duration);
        if let Some(seed) = self.sampling.rng_seed {
            let _ = writeln!(output, "rng_seed = {}", seed);
        }
        let _ = writeln!(output, "output_format = \"{}\"", self.sampling.output_format);
        let _ = writeln!(output, "tempo_bpm = {}", self.sampling.tempo_bpm);

        let _ = writeln!(output, "\n[model]");
        let _ = writeln!(output, "order = {}", self.model.order);
        let _ = writeln!(output, "smoothing = {:?}", self.model.smoothing);

        let _ = writeln!(output, "\n[telemetry]");
        let _ = writeln!(output, "log_level = {}", quoted(&self.telemetry.log_level));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = WarblerConfig::default();
        assert_eq!(config.encoding.time_step, 0.25);
        assert_eq!(config.encoding.sequence_length, 64);
        assert_eq!(config.sampling.seed, "55 _ _ _ 60 _ _ _ 55 _ _ _ 55 _");
        assert_eq!(config.sampling.num_steps, 500);
        assert_eq!(config.model.order, 8);
        assert!(!config.encoding.skip_failed_pieces);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = WarblerConfig::default();
        config.sampling.rng_seed = Some(7);
        config.sampling.output_format = OutputFormat::Abc;
        config.sampling.seed = "60 _ \"quoted\"".to_string();

        let text = config.to_toml();
        assert!(text.contains("[paths]"));
        assert!(text.contains("[telemetry]"));

        let reparsed = WarblerConfig::from_toml_str(&text).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_validate_defaults_clean() {
        assert!(WarblerConfig::default().validate().unwrap().is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = WarblerConfig::default();
        config.sampling.temperature = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "sampling.temperature"
        ));

        let mut config = WarblerConfig::default();
        config.encoding.accepted_durations.clear();
        assert!(config.validate().is_err());

        let mut config = WarblerConfig::default();
        config.encoding.time_step = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_warns_on_step_mismatch() {
        let mut config = WarblerConfig::default();
        config.sampling.step_duration = 0.5;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("step_duration"));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let err = WarblerConfig::load_from(Some(Path::new("/nonexistent/warbler.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
