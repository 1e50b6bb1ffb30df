//! Configuration sections for each pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the pipeline reads its dataset and writes its artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of notation files to preprocess.
    /// Default: dataset
    #[serde(default = "PathsConfig::default_dataset_dir")]
    pub dataset_dir: PathBuf,

    /// One encoded text file per accepted piece.
    /// Default: preprocessed/encoded
    #[serde(default = "PathsConfig::default_encoded_dir")]
    pub encoded_dir: PathBuf,

    /// The assembled single-string corpus.
    /// Default: preprocessed/corpus.txt
    #[serde(default = "PathsConfig::default_corpus_file")]
    pub corpus_file: PathBuf,

    /// Token-to-id mapping (JSON).
    /// Default: preprocessed/mapping.json
    #[serde(default = "PathsConfig::default_mapping_file")]
    pub mapping_file: PathBuf,

    /// Trained predictor (JSON).
    /// Default: models/ngram.json
    #[serde(default = "PathsConfig::default_model_file")]
    pub model_file: PathBuf,

    /// Rendered melody.
    /// Default: generated/melody.mid
    #[serde(default = "PathsConfig::default_output_file")]
    pub output_file: PathBuf,
}

impl PathsConfig {
    fn default_dataset_dir() -> PathBuf {
        PathBuf::from("dataset")
    }

    fn default_encoded_dir() -> PathBuf {
        PathBuf::from("preprocessed/encoded")
    }

    fn default_corpus_file() -> PathBuf {
        PathBuf::from("preprocessed/corpus.txt")
    }

    fn default_mapping_file() -> PathBuf {
        PathBuf::from("preprocessed/mapping.json")
    }

    fn default_model_file() -> PathBuf {
        PathBuf::from("models/ngram.json")
    }

    fn default_output_file() -> PathBuf {
        PathBuf::from("generated/melody.mid")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset_dir: Self::default_dataset_dir(),
            encoded_dir: Self::default_encoded_dir(),
            corpus_file: Self::default_corpus_file(),
            mapping_file: Self::default_mapping_file(),
            model_file: Self::default_model_file(),
            output_file: Self::default_output_file(),
        }
    }
}

/// Duration filtering, encoding grid and windowing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Grid step in quarter lengths; one symbol per step.
    /// Default: 0.25 (a sixteenth note)
    #[serde(default = "EncodingConfig::default_time_step")]
    pub time_step: f64,

    /// Training window length, also the number of boundary markers
    /// between pieces in the corpus.
    /// Default: 64
    #[serde(default = "EncodingConfig::default_sequence_length")]
    pub sequence_length: usize,

    /// Event durations (quarter lengths) a piece may contain.
    #[serde(default = "EncodingConfig::default_accepted_durations")]
    pub accepted_durations: Vec<f64>,

    /// Extension of dataset files, without the dot.
    /// Default: abc
    #[serde(default = "EncodingConfig::default_file_extension")]
    pub file_extension: String,

    /// Log and skip pieces that fail to parse or transpose instead of
    /// aborting the run.
    /// Default: false
    #[serde(default)]
    pub skip_failed_pieces: bool,
}

impl EncodingConfig {
    fn default_time_step() -> f64 {
        0.25
    }

    fn default_sequence_length() -> usize {
        64
    }

    fn default_accepted_durations() -> Vec<f64> {
        vec![0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0]
    }

    fn default_file_extension() -> String {
        "abc".to_string()
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            time_step: Self::default_time_step(),
            sequence_length: Self::default_sequence_length(),
            accepted_durations: Self::default_accepted_durations(),
            file_extension: Self::default_file_extension(),
            skip_failed_pieces: false,
        }
    }
}

/// Rendered file format for a generated melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Midi,
    Abc,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Midi => write!(f, "midi"),
            OutputFormat::Abc => write!(f, "abc"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "midi" | "mid" => Ok(OutputFormat::Midi),
            "abc" => Ok(OutputFormat::Abc),
            other => Err(format!("unknown output format '{}' (expected midi or abc)", other)),
        }
    }
}

/// Melody sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Space-separated seed tokens.
    #[serde(default = "SamplingConfig::default_seed")]
    pub seed: String,

    /// Maximum number of sampled symbols.
    /// Default: 500
    #[serde(default = "SamplingConfig::default_num_steps")]
    pub num_steps: usize,

    /// Softmax temperature; below 1 sharpens, above 1 flattens.
    /// Default: 1.0
    #[serde(default = "SamplingConfig::default_temperature")]
    pub temperature: f64,

    /// Quarter length of one decoded step.
    /// Default: 0.25
    #[serde(default = "SamplingConfig::default_step_duration")]
    pub step_duration: f64,

    /// Fixed RNG seed for reproducible output; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,

    /// Default: midi
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Tempo written to the rendered file.
    /// Default: 120
    #[serde(default = "SamplingConfig::default_tempo_bpm")]
    pub tempo_bpm: u32,
}

impl SamplingConfig {
    fn default_seed() -> String {
        "55 _ _ _ 60 _ _ _ 55 _ _ _ 55 _".to_string()
    }

    fn default_num_steps() -> usize {
        500
    }

    fn default_temperature() -> f64 {
        1.0
    }

    fn default_step_duration() -> f64 {
        0.25
    }

    fn default_tempo_bpm() -> u32 {
        120
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: Self::default_seed(),
            num_steps: Self::default_num_steps(),
            temperature: Self::default_temperature(),
            step_duration: Self::default_step_duration(),
            rng_seed: None,
            output_format: OutputFormat::default(),
            tempo_bpm: Self::default_tempo_bpm(),
        }
    }
}

/// N-gram predictor hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Longest context (in symbols) the predictor conditions on.
    /// Default: 8
    #[serde(default = "ModelConfig::default_order")]
    pub order: usize,

    /// Additive smoothing applied to every count.
    /// Default: 0.01
    #[serde(default = "ModelConfig::default_smoothing")]
    pub smoothing: f64,
}

impl ModelConfig {
    fn default_order() -> usize {
        8
    }

    fn default_smoothing() -> f64 {
        0.01
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
            smoothing: Self::default_smoothing(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
