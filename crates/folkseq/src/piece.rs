//! Pieces: the timed note/rest streams the pipeline works on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What sounds during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A MIDI pitch
    Note(u8),
    Rest,
}

/// One note or rest, duration in quarter lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub duration: f64,
}

impl Event {
    pub fn note(pitch: u8, duration: f64) -> Self {
        Event {
            kind: EventKind::Note(pitch),
            duration,
        }
    }

    pub fn rest(duration: f64) -> Self {
        Event {
            kind: EventKind::Rest,
            duration,
        }
    }

    pub fn pitch(&self) -> Option<u8> {
        match self.kind {
            EventKind::Note(p) => Some(p),
            EventKind::Rest => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyMode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyMode::Major => "major",
            KeyMode::Minor => "minor",
            KeyMode::Dorian => "dorian",
            KeyMode::Phrygian => "phrygian",
            KeyMode::Lydian => "lydian",
            KeyMode::Mixolydian => "mixolydian",
            KeyMode::Locrian => "locrian",
        };
        f.write_str(name)
    }
}

/// A tonic pitch class (C=0 .. B=11) and mode.
///
/// `spelled` is the tonic above C in its written octave. It only differs from
/// `tonic` for keys like Cb (-1) or B# (12), where the letter and the pitch
/// class sit in different octaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySignature {
    pub tonic: u8,
    pub spelled: i8,
    pub mode: KeyMode,
}

impl KeySignature {
    pub fn new(tonic: u8, mode: KeyMode) -> Self {
        let tonic = tonic % 12;
        KeySignature {
            tonic,
            spelled: tonic as i8,
            mode,
        }
    }

    /// Key from a spelled tonic semitone such as -1 for Cb.
    pub fn spelled(semitone: i8, mode: KeyMode) -> Self {
        KeySignature {
            tonic: semitone.rem_euclid(12) as u8,
            spelled: semitone,
            mode,
        }
    }
}

/// A parsed melody ready for filtering, transposition and encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    /// Stable identifier (file stem, or `stem-N` inside a collection)
    pub id: String,
    pub events: Vec<Event>,
    /// Key annotated in the source notation, if it had a usable one
    pub key: Option<KeySignature>,
}

impl Piece {
    pub fn new(id: impl Into<String>, events: Vec<Event>) -> Self {
        Piece {
            id: id.into(),
            events,
            key: None,
        }
    }

    pub fn with_key(mut self, key: KeySignature) -> Self {
        self.key = Some(key);
        self
    }

    /// Total length in quarter notes
    pub fn quarter_length(&self) -> f64 {
        self.events.iter().map(|e| e.duration).sum()
    }
}
