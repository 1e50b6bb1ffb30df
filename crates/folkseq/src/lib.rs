//! Folk melody modelling on a fixed-step symbol encoding.
//!
//! Pieces parsed from ABC notation are filtered by duration, transposed to
//! C major / A minor and expanded into one symbol per time step:
//!
//! ```text
//! 60 _ _ _ r _ 62 _ / / / /
//! ```
//!
//! A pitch or `r` starts an event, `_` holds it for another step and runs
//! of `/` separate pieces. The joined corpus is mapped to dense ids, sliced
//! into training windows and fed to a [`Predictor`]; the
//! [`MelodySampler`] then extends a seed with temperature-scaled draws
//! until it hits a boundary, and [`decode`] turns the result back into
//! timed events for MIDI or ABC output.
//!
//! # Example
//!
//! ```
//! use folkseq::{decode, encode, parse_tokens, Event};
//!
//! let events = vec![Event::note(60, 0.75), Event::rest(0.5)];
//! let symbols = encode(&events, 0.25);
//! assert_eq!(symbols, parse_tokens("60 _ _ r _").unwrap());
//! assert_eq!(decode(&symbols, 0.25).unwrap(), events);
//! ```

pub mod codec;
pub mod corpus;
pub mod error;
pub mod filter;
pub mod key;
pub mod midi;
pub mod notation;
pub mod piece;
pub mod pipeline;
pub mod predictor;
pub mod sampler;
pub mod symbol;
pub mod transpose;
pub mod vocab;
pub mod windows;

pub use codec::{decode, encode};
pub use corpus::assemble;
pub use error::{Error, Result};
pub use filter::is_acceptable;
pub use key::{detect_key, KeyEstimate};
pub use midi::{events_to_smf, write_melody, OutputFormat};
pub use notation::{piece_from_tune, tune_from_events};
pub use piece::{Event, EventKind, KeyMode, KeySignature, Piece};
pub use pipeline::{Generated, PreprocessReport, TrainReport};
pub use predictor::{NGramPredictor, Predictor};
pub use sampler::{apply_temperature, sample_index, MelodySampler};
pub use symbol::{join_tokens, parse_tokens, Symbol};
pub use transpose::transpose;
pub use vocab::Vocabulary;
pub use windows::{generate_windows, OneHotWindow, TrainingSet};
