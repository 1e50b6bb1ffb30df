//! ABC notation parser and writer.
//!
//! This crate parses ABC music notation (single tunes or whole collection
//! files) into a structured AST, and writes an AST back out as ABC text.
//!
//! # Example
//!
//! ```
//! use abc::{parse, to_abc};
//!
//! let abc = r#"
//! X:1
//! T:Test Tune
//! M:4/4
//! L:1/8
//! K:G
//! GABc dedB|cBAG D2D2|
//! "#;
//!
//! let result = parse(abc);
//! assert!(!result.has_errors());
//! let text = to_abc(&result.value);
//! assert!(text.contains("K:G"));
//! ```

pub mod ast;
pub mod feedback;
pub mod parser;
mod writer;

pub use ast::*;
pub use feedback::{Feedback, FeedbackLevel, ParseResult};
pub use parser::key::key_accidentals;
pub use writer::to_abc;

/// Parse ABC notation into a Tune AST.
///
/// This is a generous parser that will attempt to continue parsing
/// even when encountering issues, collecting feedback along the way.
pub fn parse(input: &str) -> ParseResult<Tune> {
    parser::parse(input)
}

/// Parse every tune in a collection file (tunes start at `X:` lines).
pub fn parse_collection(input: &str) -> Vec<ParseResult<Tune>> {
    parser::parse_collection(input)
}

/// Interpret a key field value such as `Bbm` or `D mixolydian`.
///
/// Returns `None` for `K:none` and for values that name no key.
pub fn parse_key(value: &str) -> Option<Key> {
    let mut collector = feedback::FeedbackCollector::new();
    parser::key::parse_key_field(value, &mut collector)
}

/// Interpret a meter field value (`6/8`, `C`, `C|`, `none`).
pub fn parse_meter(value: &str) -> Meter {
    let mut collector = feedback::FeedbackCollector::new();
    parser::header::parse_meter(value, &mut collector)
}

/// Interpret a unit length field value, falling back to 1/8.
pub fn parse_unit_length(value: &str) -> UnitLength {
    let mut collector = feedback::FeedbackCollector::new();
    parser::header::parse_unit_length(value, &mut collector)
}
