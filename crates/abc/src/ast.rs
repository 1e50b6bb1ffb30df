//! Abstract Syntax Tree types for ABC notation.
//!
//! The tree keeps what a melodic reading of a tune needs: header metadata,
//! the key annotation, and the timed elements of each voice. Ornaments and
//! chord symbols are kept as elements so a consumer can decide to skip them.

use serde::{Deserialize, Serialize};

/// A complete ABC tune
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tune {
    pub header: Header,
    pub voices: Vec<Voice>,
}

impl Default for Tune {
    fn default() -> Self {
        Tune {
            header: Header::default(),
            voices: vec![Voice::default()],
        }
    }
}

impl Tune {
    /// First voice that carries any element, falling back to the first voice.
    pub fn melody_voice(&self) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|v| !v.elements.is_empty())
            .or_else(|| self.voices.first())
    }
}

/// Tune header (metadata)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub reference: u32,
    pub title: String,
    pub titles: Vec<String>,
    /// `None` when the tune has no `K:` field or declares `K:none`.
    pub key: Option<Key>,
    pub meter: Option<Meter>,
    pub unit_length: Option<UnitLength>,
    pub tempo: Option<Tempo>,
    pub composer: Option<String>,
    pub origin: Option<String>,
    pub other_fields: Vec<InfoField>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            reference: 1,
            title: String::new(),
            titles: Vec::new(),
            key: None,
            meter: None,
            unit_length: None,
            tempo: None,
            composer: None,
            origin: None,
            other_fields: Vec::new(),
        }
    }
}

/// Key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub root: NoteName,
    pub accidental: Option<Accidental>,
    pub mode: Mode,
}

impl Key {
    pub fn new(root: NoteName, accidental: Option<Accidental>, mode: Mode) -> Self {
        Key {
            root,
            accidental,
            mode,
        }
    }

    /// Pitch class of the tonic (C=0 .. B=11)
    pub fn tonic_pitch_class(&self) -> u8 {
        self.tonic_semitone().rem_euclid(12) as u8
    }

    /// Semitones of the spelled tonic above C in its own octave, so Cb is -1
    /// and B# is 12.
    pub fn tonic_semitone(&self) -> i8 {
        let acc = self.accidental.map(|a| a.to_semitone_offset()).unwrap_or(0);
        self.root.to_semitone() + acc
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::new(NoteName::C, None, Mode::Major)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// Convert to semitone offset from C (0-11)
    pub fn to_semitone(&self) -> i8 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    /// Create from semitone offset (0-11), preferring sharps for chromatic notes
    pub fn from_semitone(semitone: i8) -> (NoteName, Option<Accidental>) {
        match semitone.rem_euclid(12) {
            0 => (NoteName::C, None),
            1 => (NoteName::C, Some(Accidental::Sharp)),
            2 => (NoteName::D, None),
            3 => (NoteName::D, Some(Accidental::Sharp)),
            4 => (NoteName::E, None),
            5 => (NoteName::F, None),
            6 => (NoteName::F, Some(Accidental::Sharp)),
            7 => (NoteName::G, None),
            8 => (NoteName::G, Some(Accidental::Sharp)),
            9 => (NoteName::A, None),
            10 => (NoteName::A, Some(Accidental::Sharp)),
            _ => (NoteName::B, None),
        }
    }

    /// Uppercase letter used by the writer
    pub fn letter(&self) -> char {
        match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    DoubleSharp,
    Sharp,
    Natural,
    Flat,
    DoubleFlat,
}

impl Accidental {
    /// Convert to semitone offset
    pub fn to_semitone_offset(&self) -> i8 {
        match self {
            Accidental::DoubleSharp => 2,
            Accidental::Sharp => 1,
            Accidental::Natural => 0,
            Accidental::Flat => -1,
            Accidental::DoubleFlat => -2,
        }
    }

    /// Body notation for this accidental (`^`, `_`, `=`...)
    pub fn as_abc(&self) -> &'static str {
        match self {
            Accidental::DoubleSharp => "^^",
            Accidental::Sharp => "^",
            Accidental::Natural => "=",
            Accidental::Flat => "_",
            Accidental::DoubleFlat => "__",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Major,
    Minor,
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl Mode {
    /// Parse mode from string (case-insensitive, allows abbreviations)
    pub fn parse(s: &str) -> Option<Mode> {
        let s = s.to_lowercase();
        // ABC only looks at the first three letters of a mode name
        let prefix: String = s.chars().take(3).collect();
        match prefix.as_str() {
            "" | "maj" => Some(Mode::Major),
            "m" | "min" => Some(Mode::Minor),
            "ion" => Some(Mode::Ionian),
            "dor" => Some(Mode::Dorian),
            "phr" => Some(Mode::Phrygian),
            "lyd" => Some(Mode::Lydian),
            "mix" => Some(Mode::Mixolydian),
            "aeo" => Some(Mode::Aeolian),
            "loc" => Some(Mode::Locrian),
            _ => None,
        }
    }

    /// Sharps (positive) or flats (negative) this mode adds relative to
    /// the major key on the same root.
    pub fn signature_offset(&self) -> i8 {
        match self {
            Mode::Major | Mode::Ionian => 0,
            Mode::Minor | Mode::Aeolian => -3,
            Mode::Dorian => -2,
            Mode::Phrygian => -4,
            Mode::Lydian => 1,
            Mode::Mixolydian => -1,
            Mode::Locrian => -5,
        }
    }

    /// Suffix used when writing a `K:` field
    pub fn as_abc(&self) -> &'static str {
        match self {
            Mode::Major => "",
            Mode::Minor => "m",
            Mode::Ionian => "ion",
            Mode::Dorian => "dor",
            Mode::Phrygian => "phr",
            Mode::Lydian => "lyd",
            Mode::Mixolydian => "mix",
            Mode::Aeolian => "aeo",
            Mode::Locrian => "loc",
        }
    }
}

/// Meter/time signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Meter {
    Simple { numerator: u8, denominator: u8 },
    Common, // C = 4/4
    Cut,    // C| = 2/2
    None,   // Free meter
}

impl Meter {
    /// Beats per bar and beat unit
    pub fn to_fraction(&self) -> (u8, u8) {
        match self {
            Meter::Simple {
                numerator,
                denominator,
            } => (*numerator, *denominator),
            Meter::Common => (4, 4),
            Meter::Cut => (2, 2),
            Meter::None => (4, 4),
        }
    }

    /// Length of one bar in quarter notes
    pub fn bar_quarter_length(&self) -> f64 {
        let (num, den) = self.to_fraction();
        if den == 0 {
            return 4.0;
        }
        num as f64 * 4.0 / den as f64
    }
}

/// Unit note length (L: field)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitLength {
    pub numerator: u8,
    pub denominator: u8,
}

impl UnitLength {
    /// Length of one unit in quarter notes
    pub fn quarter_length(&self) -> f64 {
        if self.denominator == 0 {
            return 0.5;
        }
        4.0 * self.numerator as f64 / self.denominator as f64
    }
}

impl Default for UnitLength {
    fn default() -> Self {
        UnitLength {
            numerator: 1,
            denominator: 8,
        }
    }
}

/// Tempo (Q: field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub beat_unit: (u8, u8),
    pub bpm: u16,
    pub text: Option<String>,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            beat_unit: (1, 4),
            bpm: 120,
            text: None,
        }
    }
}

/// Generic info field (for fields we don't specifically handle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoField {
    pub field_type: char,
    pub value: String,
}

/// A voice (track) in the tune
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Voice {
    pub id: Option<String>,
    pub elements: Vec<Element>,
}

/// A music element in the body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Note(Note),
    Chord(Chord),
    Rest(Rest),
    Bar(Bar),
    Tuplet(Tuplet),
    /// `>` / `<` between two notes; `count` is 1 for `>`, 2 for `>>`.
    BrokenRhythm(BrokenRhythm),
    GraceNotes(Vec<Note>),
    ChordSymbol(String),
    InlineField(InfoField),
    Decoration(String),
    Slur(SlurBoundary),
    VoiceSwitch(String),
    Space,
    LineBreak,
}

/// A single note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: NoteName,
    pub octave: i8, // 0 = C-B (middle C octave), 1 = c-b, -1 = C,-B,
    pub accidental: Option<Accidental>,
    pub duration: Duration,
    pub tie: bool,
}

impl Note {
    /// Create a simple note with default duration
    pub fn new(pitch: NoteName, octave: i8) -> Self {
        Note {
            pitch,
            octave,
            accidental: None,
            duration: Duration::default(),
            tie: false,
        }
    }

    /// MIDI pitch ignoring key signature (uppercase `C` = 60)
    pub fn to_midi_pitch(&self) -> u8 {
        let acc = self.accidental.map(|a| a.to_semitone_offset()).unwrap_or(0);
        midi_pitch(self.pitch, self.octave, acc)
    }
}

/// MIDI number for a letter, ABC octave and semitone alteration, clamped to 0..=127.
pub fn midi_pitch(pitch: NoteName, octave: i8, alteration: i8) -> u8 {
    let value = pitch.to_semitone() as i16 + (octave as i16 + 5) * 12 + alteration as i16;
    value.clamp(0, 127) as u8
}

/// Note duration as a ratio of the unit length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub numerator: u16,
    pub denominator: u16,
}

impl Duration {
    pub fn new(numerator: u16, denominator: u16) -> Self {
        Duration {
            numerator,
            denominator,
        }
    }

    pub fn unit() -> Self {
        Duration::new(1, 1)
    }

    /// Ratio as a float (units of `L:`)
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    /// Multiply two ratios (used for `[C2E2]3` style chords)
    pub fn scale(&self, other: Duration) -> Duration {
        Duration::new(
            self.numerator.saturating_mul(other.numerator),
            self.denominator.saturating_mul(other.denominator),
        )
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::unit()
    }
}

/// Chord (simultaneous notes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub notes: Vec<Note>,
    pub duration: Duration,
}

/// Rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    pub duration: Duration,
    pub visible: bool,              // z vs x
    pub multi_measure: Option<u16>, // Z4 = 4 bars
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Rest {
            duration,
            visible: true,
            multi_measure: None,
        }
    }
}

/// Bar line types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bar {
    Single,       // |
    Double,       // ||
    End,          // |]
    Start,        // [|
    RepeatStart,  // |:
    RepeatEnd,    // :|
    RepeatBoth,   // ::
    FirstEnding,  // |1
    SecondEnding, // :|2
}

impl Bar {
    pub fn as_abc(&self) -> &'static str {
        match self {
            Bar::Single => "|",
            Bar::Double => "||",
            Bar::End => "|]",
            Bar::Start => "[|",
            Bar::RepeatStart => "|:",
            Bar::RepeatEnd => ":|",
            Bar::RepeatBoth => "::",
            Bar::FirstEnding => "|1",
            Bar::SecondEnding => ":|2",
        }
    }
}

/// Tuplet: `p` notes in the time of `q`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuplet {
    pub p: u8,
    pub q: u8,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenRhythm {
    /// `true` for `>` (first note lengthened), `false` for `<`
    pub first_longer: bool,
    pub count: u8,
}

impl BrokenRhythm {
    /// Multipliers for the (first, second) note of the pair
    pub fn factors(&self) -> (f64, f64) {
        let short = 0.5_f64.powi(self.count.clamp(1, 3) as i32);
        let long = 2.0 - short;
        if self.first_longer {
            (long, short)
        } else {
            (short, long)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlurBoundary {
    Start,
    End,
}
