//! Key normalization: major pieces move to C, minor pieces to A.

use tracing::debug;

use crate::error::{Error, Result};
use crate::key::detect_key;
use crate::piece::{Event, EventKind, KeyMode, KeySignature, Piece};

/// The annotated key, or the statistical estimate when there is none.
pub fn resolve_key(piece: &Piece) -> KeySignature {
    match piece.key {
        Some(key) => key,
        None => {
            let estimate = detect_key(&piece.events);
            debug!(
                piece = %piece.id,
                tonic = estimate.key.tonic,
                mode = %estimate.key.mode,
                confidence = estimate.confidence,
                "no key annotation, using detected key"
            );
            estimate.key
        }
    }
}

/// Semitones that move `key` onto C major or A minor, measured from the
/// spelled tonic so Cb moves up to C and B# down to A.
pub fn interval(piece_id: &str, key: KeySignature) -> Result<i8> {
    let target = match key.mode {
        KeyMode::Major => 0,
        KeyMode::Minor => 9,
        mode => {
            return Err(Error::UnsupportedMode {
                piece: piece_id.to_string(),
                mode: mode.to_string(),
            })
        }
    };
    Ok(target - key.spelled)
}

/// Transpose `piece` to the canonical key. Rests are untouched.
pub fn transpose(piece: &Piece) -> Result<Piece> {
    let key = resolve_key(piece);
    let shift = interval(&piece.id, key)?;

    let events = piece
        .events
        .iter()
        .map(|event| match event.kind {
            EventKind::Note(pitch) => {
                let moved = pitch as i16 + shift as i16;
                if !(0..=127).contains(&moved) {
                    return Err(Error::PitchOutOfRange {
                        piece: piece.id.clone(),
                        pitch: moved,
                    });
                }
                Ok(Event::note(moved as u8, event.duration))
            }
            EventKind::Rest => Ok(*event),
        })
        .collect::<Result<Vec<_>>>()?;

    let target = match key.mode {
        KeyMode::Minor => KeySignature::new(9, KeyMode::Minor),
        _ => KeySignature::new(0, KeyMode::Major),
    };

    Ok(Piece {
        id: piece.id.clone(),
        events,
        key: Some(target),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pitches(piece: &Piece) -> Vec<Option<u8>> {
        piece.events.iter().map(Event::pitch).collect()
    }

    #[test]
    fn major_moves_to_c() {
        let piece = Piece::new(
            "g",
            vec![Event::note(67, 1.0), Event::rest(0.5), Event::note(71, 1.0)],
        )
        .with_key(KeySignature::new(7, KeyMode::Major));

        let moved = transpose(&piece).unwrap();
        assert_eq!(pitches(&moved), vec![Some(60), None, Some(64)]);
        assert_eq!(moved.events[1].duration, 0.5);
        assert_eq!(moved.key, Some(KeySignature::new(0, KeyMode::Major)));
    }

    #[test]
    fn minor_moves_to_a() {
        // E minor up a fifth to A minor
        let piece = Piece::new("em", vec![Event::note(64, 1.0), Event::note(67, 1.0)])
            .with_key(KeySignature::new(4, KeyMode::Minor));
        assert_eq!(pitches(&transpose(&piece).unwrap()), vec![Some(69), Some(72)]);
    }

    #[test]
    fn shift_range() {
        let shift = |tonic, mode| interval("x", KeySignature::new(tonic, mode)).unwrap();
        assert_eq!(shift(0, KeyMode::Major), 0);
        assert_eq!(shift(11, KeyMode::Major), -11);
        assert_eq!(shift(9, KeyMode::Minor), 0);
        assert_eq!(shift(0, KeyMode::Minor), 9);
        assert_eq!(shift(11, KeyMode::Minor), -2);
    }

    #[test]
    fn spelled_tonic_sets_the_octave() {
        let cb = KeySignature::spelled(-1, KeyMode::Major);
        assert_eq!(cb.tonic, 11);
        assert_eq!(interval("cb", cb).unwrap(), 1);
        assert_eq!(interval("b", KeySignature::new(11, KeyMode::Major)).unwrap(), -11);
        assert_eq!(interval("b#m", KeySignature::spelled(12, KeyMode::Minor)).unwrap(), -3);
    }

    #[test]
    fn c_flat_tune_moves_up_to_c() {
        let tune = abc::parse("X:1\nL:1/4\nK:Cb\nC D|\n").value;
        let piece = crate::notation::piece_from_tune("cb", &tune);
        assert_eq!(pitches(&piece), vec![Some(59), Some(61)]);
        assert_eq!(pitches(&transpose(&piece).unwrap()), vec![Some(60), Some(62)]);
    }

    #[test]
    fn modal_keys_are_rejected() {
        let piece = Piece::new("dorian", vec![Event::note(62, 1.0)])
            .with_key(KeySignature::new(2, KeyMode::Dorian));
        assert!(matches!(
            transpose(&piece),
            Err(Error::UnsupportedMode { ref mode, .. }) if mode == "dorian"
        ));
    }

    #[test]
    fn missing_key_falls_back_to_detection() {
        // G major melody without annotation
        let piece = Piece::new(
            "unmarked",
            vec![
                Event::note(67, 2.0),
                Event::note(69, 0.5),
                Event::note(71, 1.0),
                Event::note(72, 0.5),
                Event::note(74, 1.5),
                Event::note(76, 0.5),
                Event::note(78, 0.5),
                Event::note(79, 2.0),
            ],
        );
        assert_eq!(resolve_key(&piece), KeySignature::new(7, KeyMode::Major));
        assert_eq!(transpose(&piece).unwrap().events[0].pitch(), Some(60));
    }

    #[test]
    fn pitch_leaving_midi_range_fails() {
        let piece = Piece::new("low", vec![Event::note(3, 1.0)])
            .with_key(KeySignature::new(7, KeyMode::Major));
        assert!(matches!(
            transpose(&piece),
            Err(Error::PitchOutOfRange { pitch: -4, .. })
        ));
    }
}
