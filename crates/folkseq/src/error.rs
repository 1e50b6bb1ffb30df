use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the melody pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse {piece}: {message}")]
    Parse { piece: String, message: String },

    #[error("{piece} is in {mode} mode; only major and minor keys can be transposed")]
    UnsupportedMode { piece: String, mode: String },

    #[error("{piece}: pitch {pitch} is outside the MIDI range after transposition")]
    PitchOutOfRange { piece: String, pitch: i16 },

    #[error("invalid token '{0}'")]
    InvalidToken(String),

    #[error("symbol '{0}' is not in the vocabulary")]
    UnknownSymbol(String),

    #[error("id {0} is not in the vocabulary")]
    UnknownId(usize),

    #[error("invalid vocabulary mapping: {0}")]
    InvalidMapping(String),

    #[error("temperature must be greater than 0, got {0}")]
    InvalidTemperature(f64),

    #[error("invalid probability distribution: {0}")]
    InvalidDistribution(String),

    #[error("predictor returned {actual} probabilities for a vocabulary of {expected}")]
    DistributionSize { expected: usize, actual: usize },

    #[error("window is {actual} wide but the predictor expects {expected} columns")]
    WindowShape { expected: usize, actual: usize },

    #[error("boundary marker at position {position} inside a melody")]
    UnexpectedBoundary { position: usize },

    #[error("corpus is empty; preprocess a dataset first")]
    EmptyCorpus,

    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode MIDI: {0}")]
    Midi(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}
