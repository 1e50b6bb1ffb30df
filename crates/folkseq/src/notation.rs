//! Bridge between ABC tunes and pieces.
//!
//! Reading flattens the melody voice of a tune into a monophonic event
//! stream: key and bar accidentals are resolved into MIDI pitches, and
//! tuplets and broken rhythms into quarter-length durations. Writing turns
//! decoded events back into a single-voice tune.

use std::collections::HashMap;

use abc::{
    key_accidentals, midi_pitch, Accidental, Bar, Chord, Duration, Element, Header, Key, Meter,
    Mode, Note, NoteName, Rest, Tune, UnitLength, Voice,
};
use tracing::debug;

use crate::piece::{Event, EventKind, KeyMode, KeySignature, Piece};

/// Ticks per quarter note used when laying events out in bars.
const TICKS_PER_QUARTER: u64 = 480;

/// Flatten the melody voice of `tune` into a piece.
pub fn piece_from_tune(id: impl Into<String>, tune: &Tune) -> Piece {
    let id = id.into();
    let header = &tune.header;

    let mut reader = VoiceReader::new(header);
    if let Some(voice) = tune.melody_voice() {
        reader.walk(&voice.elements, 1.0);
    }

    debug!(piece = %id, events = reader.events.len(), "flattened tune");

    Piece {
        id,
        events: reader.events,
        key: header.key.as_ref().map(key_signature),
    }
}

/// Map an ABC key onto the pipeline's key type.
pub fn key_signature(key: &Key) -> KeySignature {
    let mode = match key.mode {
        Mode::Major | Mode::Ionian => KeyMode::Major,
        Mode::Minor | Mode::Aeolian => KeyMode::Minor,
        Mode::Dorian => KeyMode::Dorian,
        Mode::Phrygian => KeyMode::Phrygian,
        Mode::Lydian => KeyMode::Lydian,
        Mode::Mixolydian => KeyMode::Mixolydian,
        Mode::Locrian => KeyMode::Locrian,
    };
    KeySignature::spelled(key.tonic_semitone(), mode)
}

struct VoiceReader {
    events: Vec<Event>,
    /// Alteration per letter implied by the current key
    key_alterations: [i8; 7],
    /// Explicit accidentals seen since the last bar line
    bar_alterations: HashMap<(NoteName, i8), i8>,
    unit_quarters: f64,
    bar_quarters: f64,
    /// Second factor of a broken-rhythm pair, applied to the next event
    pending_broken: Option<f64>,
}

impl VoiceReader {
    fn new(header: &Header) -> Self {
        let mut reader = VoiceReader {
            events: Vec::new(),
            key_alterations: [0; 7],
            bar_alterations: HashMap::new(),
            unit_quarters: header.unit_length.unwrap_or_default().quarter_length(),
            bar_quarters: header
                .meter
                .as_ref()
                .map(Meter::bar_quarter_length)
                .unwrap_or(4.0),
            pending_broken: None,
        };
        if let Some(key) = &header.key {
            reader.set_key(key);
        }
        reader
    }

    fn set_key(&mut self, key: &Key) {
        self.key_alterations = [0; 7];
        for (name, accidental) in key_accidentals(key) {
            self.key_alterations[letter_index(name)] = accidental.to_semitone_offset();
        }
    }

    fn walk(&mut self, elements: &[Element], scale: f64) {
        for element in elements {
            match element {
                Element::Note(note) => {
                    let pitch = self.resolve_pitch(note);
                    let duration = self.length(note.duration, scale);
                    self.push(Event::note(pitch, duration));
                }
                Element::Chord(chord) => self.push_chord(chord, scale),
                Element::Rest(rest) => {
                    let duration = self.rest_length(rest, scale);
                    self.push(Event::rest(duration));
                }
                Element::Tuplet(tuplet) => {
                    let ratio = tuplet.q as f64 / tuplet.p.max(1) as f64;
                    self.walk(&tuplet.elements, scale * ratio);
                }
                Element::BrokenRhythm(broken) => {
                    let (first, second) = broken.factors();
                    if let Some(last) = self.events.last_mut() {
                        last.duration *= first;
                        self.pending_broken = Some(second);
                    }
                }
                Element::Bar(_) => self.bar_alterations.clear(),
                Element::InlineField(field) => self.apply_field(field.field_type, &field.value),
                Element::GraceNotes(_)
                | Element::ChordSymbol(_)
                | Element::Decoration(_)
                | Element::Slur(_)
                | Element::VoiceSwitch(_)
                | Element::Space
                | Element::LineBreak => {}
            }
        }
    }

    fn push(&mut self, mut event: Event) {
        if let Some(factor) = self.pending_broken.take() {
            event.duration *= factor;
        }
        self.events.push(event);
    }

    fn push_chord(&mut self, chord: &Chord, scale: f64) {
        let pitches: Vec<u8> = chord.notes.iter().map(|n| self.resolve_pitch(n)).collect();
        let (Some(&top), Some(first)) = (pitches.iter().max(), chord.notes.first()) else {
            return;
        };
        let duration = self.length(chord.duration.scale(first.duration), scale);
        self.push(Event::note(top, duration));
    }

    fn resolve_pitch(&mut self, note: &Note) -> u8 {
        let slot = (note.pitch, note.octave);
        let alteration = match note.accidental {
            Some(accidental) => {
                let offset = accidental.to_semitone_offset();
                self.bar_alterations.insert(slot, offset);
                offset
            }
            None => self
                .bar_alterations
                .get(&slot)
                .copied()
                .unwrap_or(self.key_alterations[letter_index(note.pitch)]),
        };
        midi_pitch(note.pitch, note.octave, alteration)
    }

    fn length(&self, duration: Duration, scale: f64) -> f64 {
        duration.as_f64() * self.unit_quarters * scale
    }

    fn rest_length(&self, rest: &Rest, scale: f64) -> f64 {
        match rest.multi_measure {
            Some(bars) => bars as f64 * self.bar_quarters,
            None => self.length(rest.duration, scale),
        }
    }

    fn apply_field(&mut self, field_type: char, value: &str) {
        match field_type {
            'K' => {
                if let Some(key) = abc::parse_key(value) {
                    self.set_key(&key);
                }
            }
            'L' => self.unit_quarters = abc::parse_unit_length(value).quarter_length(),
            'M' => self.bar_quarters = abc::parse_meter(value).bar_quarter_length(),
            _ => {}
        }
    }
}

fn letter_index(name: NoteName) -> usize {
    match name {
        NoteName::C => 0,
        NoteName::D => 1,
        NoteName::E => 2,
        NoteName::F => 3,
        NoteName::G => 4,
        NoteName::A => 5,
        NoteName::B => 6,
    }
}

/// Render decoded events as a single-voice tune in C major with a
/// sixteenth-note unit length and 4/4 bars.
///
/// Events crossing a bar line are split; split notes are tied.
pub fn tune_from_events(title: &str, events: &[Event]) -> Tune {
    const UNIT_TICKS: u64 = TICKS_PER_QUARTER / 4;
    const BAR_TICKS: u64 = TICKS_PER_QUARTER * 4;
    const BARS_PER_LINE: u64 = 4;

    let mut elements = Vec::new();
    let mut position: u64 = 0;
    // Alteration a reader would currently assume per (letter, octave)
    let mut carried: HashMap<(NoteName, i8), i8> = HashMap::new();

    for event in events {
        let mut remaining = (event.duration.max(0.0) * TICKS_PER_QUARTER as f64).round() as u64;

        while remaining > 0 {
            let room = BAR_TICKS - position % BAR_TICKS;
            let take = remaining.min(room);
            remaining -= take;
            let duration = unit_duration(take, UNIT_TICKS);

            match event.kind {
                EventKind::Note(pitch) => {
                    let mut note = spelled_note(pitch, &mut carried);
                    note.duration = duration;
                    note.tie = remaining > 0;
                    elements.push(Element::Note(note));
                }
                EventKind::Rest => elements.push(Element::Rest(Rest::new(duration))),
            }

            position += take;
            if position % BAR_TICKS == 0 {
                elements.push(Element::Bar(Bar::Single));
                carried.clear();
                if (position / BAR_TICKS) % BARS_PER_LINE == 0 {
                    elements.push(Element::LineBreak);
                }
            } else {
                elements.push(Element::Space);
            }
        }
    }

    // Close with a final bar in place of whatever separator came last
    while matches!(
        elements.last(),
        Some(Element::Space | Element::LineBreak | Element::Bar(_))
    ) {
        elements.pop();
    }
    if !elements.is_empty() {
        elements.push(Element::Bar(Bar::End));
    }

    Tune {
        header: Header {
            title: title.to_string(),
            key: Some(Key::new(NoteName::C, None, Mode::Major)),
            meter: Some(Meter::Simple {
                numerator: 4,
                denominator: 4,
            }),
            unit_length: Some(UnitLength {
                numerator: 1,
                denominator: 16,
            }),
            ..Header::default()
        },
        voices: vec![Voice {
            id: None,
            elements,
        }],
    }
}

/// Note spelled with sharps, with an explicit accidental only where the
/// carried accidental state would otherwise give the wrong pitch.
fn spelled_note(pitch: u8, carried: &mut HashMap<(NoteName, i8), i8>) -> Note {
    let (name, accidental) = NoteName::from_semitone((pitch % 12) as i8);
    let octave = (pitch / 12) as i8 - 5;
    let alteration = accidental.map(|a| a.to_semitone_offset()).unwrap_or(0);

    let mut note = Note::new(name, octave);
    let assumed = carried.get(&(name, octave)).copied().unwrap_or(0);
    if alteration != assumed {
        note.accidental = Some(if alteration > 0 {
            Accidental::Sharp
        } else {
            Accidental::Natural
        });
        carried.insert((name, octave), alteration);
    }
    note
}

/// `ticks` as a multiple of the unit length, reduced.
fn unit_duration(ticks: u64, unit_ticks: u64) -> Duration {
    let divisor = gcd(ticks, unit_ticks).max(1);
    let numerator = (ticks / divisor).min(u16::MAX as u64) as u16;
    let denominator = (unit_ticks / divisor) as u16;
    Duration::new(numerator, denominator)
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn piece(abc_text: &str) -> Piece {
        let result = abc::parse(abc_text);
        assert!(!result.has_errors(), "{:?}", result.feedback);
        piece_from_tune("test", &result.value)
    }

    fn pitches(piece: &Piece) -> Vec<Option<u8>> {
        piece.events.iter().map(Event::pitch).collect()
    }

    fn durations(piece: &Piece) -> Vec<f64> {
        piece.events.iter().map(|e| e.duration).collect()
    }

    #[test]
    fn uppercase_c_is_middle_c() {
        let p = piece("X:1\nL:1/4\nK:C\nC c C, z|");
        assert_eq!(pitches(&p), vec![Some(60), Some(72), Some(48), None]);
        assert_eq!(durations(&p), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn key_signature_applies_to_every_octave() {
        // G major: every F is F sharp
        let p = piece("X:1\nL:1/4\nK:G\nF f F,|");
        assert_eq!(pitches(&p), vec![Some(66), Some(78), Some(54)]);
    }

    #[test]
    fn accidentals_last_until_the_bar_line() {
        let p = piece("X:1\nL:1/4\nK:C\n^C C c | C =F ^F F|");
        assert_eq!(
            pitches(&p),
            vec![Some(61), Some(61), Some(72), Some(60), Some(65), Some(66), Some(66)]
        );
    }

    #[test]
    fn natural_cancels_key_signature() {
        let p = piece("X:1\nL:1/4\nK:D\n=F F|F|");
        assert_eq!(pitches(&p), vec![Some(65), Some(65), Some(66)]);
    }

    #[test]
    fn unit_length_scales_durations() {
        let p = piece("X:1\nM:4/4\nL:1/8\nK:C\nC C2 C/2 C3/2 C4|");
        assert_eq!(durations(&p), vec![0.5, 1.0, 0.25, 0.75, 2.0]);
    }

    #[test]
    fn broken_rhythm_adjusts_both_notes() {
        let p = piece("X:1\nL:1/8\nK:C\nC>D E<F G>>A|");
        assert_eq!(durations(&p), vec![0.75, 0.25, 0.25, 0.75, 0.875, 0.125]);
    }

    #[test]
    fn triplets_take_two_thirds() {
        let p = piece("X:1\nL:1/8\nK:C\n(3CDE F|");
        let d = durations(&p);
        assert!((d[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((d[2] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(d[3], 0.5);
    }

    #[test]
    fn chords_keep_the_top_note() {
        let p = piece("X:1\nL:1/4\nK:C\n[CEG]2 [ce]|");
        assert_eq!(pitches(&p), vec![Some(67), Some(76)]);
        assert_eq!(durations(&p), vec![2.0, 1.0]);
    }

    #[test]
    fn ornaments_produce_no_events() {
        let p = piece("X:1\nL:1/4\nK:C\n\"Am\"{g}~A !fermata!B (cd)|");
        assert_eq!(pitches(&p), vec![Some(69), Some(71), Some(72), Some(74)]);
    }

    #[test]
    fn ties_stay_separate_events() {
        let p = piece("X:1\nL:1/4\nK:C\nC2- C|");
        assert_eq!(pitches(&p), vec![Some(60), Some(60)]);
        assert_eq!(durations(&p), vec![2.0, 1.0]);
    }

    #[test]
    fn multi_measure_rest_uses_meter() {
        let p = piece("X:1\nM:3/4\nL:1/4\nK:C\nZ2|C|");
        assert_eq!(durations(&p), vec![6.0, 1.0]);
    }

    #[test]
    fn inline_key_change() {
        let p = piece("X:1\nL:1/4\nK:C\nF [K:F] B|");
        assert_eq!(pitches(&p), vec![Some(65), Some(70)]);
    }

    #[test]
    fn header_key_becomes_piece_key() {
        assert_eq!(
            piece("X:1\nK:Em\nE|").key,
            Some(KeySignature::new(4, KeyMode::Minor))
        );
        assert_eq!(
            piece("X:1\nK:A aeolian\nA|").key,
            Some(KeySignature::new(9, KeyMode::Minor))
        );
        assert_eq!(
            piece("X:1\nK:D dor\nD|").key,
            Some(KeySignature::new(2, KeyMode::Dorian))
        );
        assert_eq!(piece("X:1\nK:none\nC|").key, None);
    }

    #[test]
    fn events_render_with_bars_and_ties() {
        let events = vec![
            Event::note(61, 3.0),
            Event::note(60, 2.0),
            Event::rest(1.0),
            Event::note(61, 0.25),
        ];
        let tune = tune_from_events("Generated", &events);
        let text = abc::to_abc(&tune);

        assert!(text.contains("K:C\n"));
        assert!(text.contains("L:1/16\n"));
        // C# spelled sharp, tied over the bar after the rest of the first bar,
        // natural restored for the following C
        assert!(text.contains("^C12 =C4-|C4 z4 ^C|]"), "{}", text);
    }

    #[test]
    fn rendered_events_read_back_identically() {
        let events = vec![
            Event::note(67, 0.75),
            Event::note(66, 0.25),
            Event::rest(0.5),
            Event::note(79, 1.5),
            Event::note(55, 1.0),
        ];
        let text = abc::to_abc(&tune_from_events("Loop", &events));
        assert_eq!(piece(&text).events, events);
    }
}
