//! Events to fixed-step symbols and back.

use tracing::debug;

use crate::error::{Error, Result};
use crate::piece::{Event, EventKind};
use crate::symbol::Symbol;

/// Expand events into one symbol per `time_step`.
///
/// Each event contributes its onset symbol followed by
/// `floor(duration / time_step) - 1` holds. Events shorter than one step
/// still emit their onset.
pub fn encode(events: &[Event], time_step: f64) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for event in events {
        symbols.push(match event.kind {
            EventKind::Note(pitch) => Symbol::Pitch(pitch),
            EventKind::Rest => Symbol::Rest,
        });
        let steps = (event.duration / time_step).floor() as usize;
        symbols.extend(std::iter::repeat(Symbol::Hold).take(steps.saturating_sub(1)));
    }
    symbols
}

/// Collapse a symbol stream back into events of `step_duration` multiples.
pub fn decode(symbols: &[Symbol], step_duration: f64) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let mut pending: Option<Symbol> = None;
    let mut steps: u32 = 1;

    let flush = |pending: Symbol, steps: u32, events: &mut Vec<Event>| {
        let duration = steps as f64 * step_duration;
        match pending {
            Symbol::Pitch(pitch) => events.push(Event::note(pitch, duration)),
            Symbol::Rest => events.push(Event::rest(duration)),
            Symbol::Hold | Symbol::Boundary => {}
        }
    };

    for (position, symbol) in symbols.iter().enumerate() {
        match symbol {
            Symbol::Hold => {
                if pending.is_some() {
                    steps += 1;
                } else {
                    debug!(position, "dropping hold with nothing sounding");
                }
            }
            Symbol::Boundary => return Err(Error::UnexpectedBoundary { position }),
            onset => {
                if let Some(previous) = pending.take() {
                    flush(previous, steps, &mut events);
                }
                steps = 1;
                pending = Some(*onset);
            }
        }
    }

    if let Some(previous) = pending {
        flush(previous, steps, &mut events);
    }

    Ok(events)
}
