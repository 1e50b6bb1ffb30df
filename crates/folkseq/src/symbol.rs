//! The time-series alphabet.
//!
//! One symbol is emitted per time step: a MIDI pitch or a rest where an
//! event starts, a hold while it sounds, and runs of boundary markers
//! between pieces.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const REST_TOKEN: &str = "r";
pub const HOLD_TOKEN: &str = "_";
pub const BOUNDARY_TOKEN: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    /// A note starting on this step (MIDI 0..=127)
    Pitch(u8),
    /// A rest starting on this step
    Rest,
    /// The previous note or rest is still sounding
    Hold,
    /// Separator between pieces; also the sampler's stop signal
    Boundary,
}

impl Symbol {
    /// An event start, as opposed to a hold or boundary
    pub fn is_onset(&self) -> bool {
        matches!(self, Symbol::Pitch(_) | Symbol::Rest)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Pitch(p) => write!(f, "{}", p),
            Symbol::Rest => f.write_str(REST_TOKEN),
            Symbol::Hold => f.write_str(HOLD_TOKEN),
            Symbol::Boundary => f.write_str(BOUNDARY_TOKEN),
        }
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            REST_TOKEN => Ok(Symbol::Rest),
            HOLD_TOKEN => Ok(Symbol::Hold),
            BOUNDARY_TOKEN => Ok(Symbol::Boundary),
            _ => {
                // Only the canonical spelling, so "060" or "+60" cannot alias "60"
                let pitch: u8 = s.parse().map_err(|_| Error::InvalidToken(s.to_string()))?;
                if pitch > 127 || pitch.to_string() != s {
                    return Err(Error::InvalidToken(s.to_string()));
                }
                Ok(Symbol::Pitch(pitch))
            }
        }
    }
}

/// Split a whitespace-separated token string into symbols.
pub fn parse_tokens(text: &str) -> Result<Vec<Symbol>> {
    text.split_whitespace().map(str::parse).collect()
}

/// Join symbols with single spaces.
pub fn join_tokens(symbols: &[Symbol]) -> String {
    let mut out = String::with_capacity(symbols.len() * 3);
    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&symbol.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_to_symbols() {
        let symbols = parse_tokens("60 _ r  _\n/ 127").unwrap();
        assert_eq!(
            symbols,
            vec![
                Symbol::Pitch(60),
                Symbol::Hold,
                Symbol::Rest,
                Symbol::Hold,
                Symbol::Boundary,
                Symbol::Pitch(127)
            ]
        );
    }

    #[test]
    fn rejects_non_canonical_tokens() {
        for bad in ["128", "060", "-1", "R", "x", "6_0"] {
            assert!(
                matches!(bad.parse::<Symbol>(), Err(Error::InvalidToken(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn join_uses_single_spaces() {
        let symbols = [Symbol::Pitch(55), Symbol::Hold, Symbol::Rest];
        assert_eq!(join_tokens(&symbols), "55 _ r");
        assert_eq!(join_tokens(&[]), "");
    }

    #[test]
    fn onsets() {
        assert!(Symbol::Pitch(60).is_onset());
        assert!(Symbol::Rest.is_onset());
        assert!(!Symbol::Hold.is_onset());
        assert!(!Symbol::Boundary.is_onset());
    }
}
