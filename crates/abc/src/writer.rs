//! ABC text output.
//!
//! Writes the subset of the notation the parser reads back: header fields,
//! notes, chords, rests, bars, tuplets and line structure.

use std::fmt::Write;

use crate::ast::{
    Chord, Duration, Element, Header, Key, Meter, Note, Rest, SlurBoundary, Tune, Voice,
};

/// Render a tune as ABC text.
pub fn to_abc(tune: &Tune) -> String {
    let mut out = String::new();
    write_header(&mut out, &tune.header);

    let named_voices = tune.voices.len() > 1 || tune.voices.iter().any(|v| v.id.is_some());
    for voice in &tune.voices {
        write_voice(&mut out, voice, named_voices);
    }

    out
}

fn write_header(out: &mut String, header: &Header) {
    let _ = writeln!(out, "X:{}", header.reference);
    let _ = writeln!(out, "T:{}", header.title);
    for title in &header.titles {
        let _ = writeln!(out, "T:{}", title);
    }
    if let Some(composer) = &header.composer {
        let _ = writeln!(out, "C:{}", composer);
    }
    if let Some(origin) = &header.origin {
        let _ = writeln!(out, "O:{}", origin);
    }
    for field in &header.other_fields {
        let _ = writeln!(out, "{}:{}", field.field_type, field.value);
    }
    if let Some(meter) = &header.meter {
        let _ = writeln!(out, "M:{}", meter_text(meter));
    }
    if let Some(unit) = &header.unit_length {
        let _ = writeln!(out, "L:{}/{}", unit.numerator, unit.denominator);
    }
    if let Some(tempo) = &header.tempo {
        let _ = writeln!(
            out,
            "Q:{}/{}={}",
            tempo.beat_unit.0, tempo.beat_unit.1, tempo.bpm
        );
    }
    // K: closes the header
    let _ = writeln!(
        out,
        "K:{}",
        header.key.as_ref().map(key_text).unwrap_or_else(|| "none".to_string())
    );
}

fn meter_text(meter: &Meter) -> String {
    match meter {
        Meter::Simple {
            numerator,
            denominator,
        } => format!("{}/{}", numerator, denominator),
        Meter::Common => "C".to_string(),
        Meter::Cut => "C|".to_string(),
        Meter::None => "none".to_string(),
    }
}

fn key_text(key: &Key) -> String {
    let accidental = match key.accidental.map(|a| a.to_semitone_offset()) {
        Some(1) => "#",
        Some(-1) => "b",
        _ => "",
    };
    format!("{}{}{}", key.root.letter(), accidental, key.mode.as_abc())
}

fn write_voice(out: &mut String, voice: &Voice, named: bool) {
    if named {
        let _ = writeln!(out, "V:{}", voice.id.as_deref().unwrap_or("1"));
    }
    for element in &voice.elements {
        write_element(out, element);
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
}

fn write_element(out: &mut String, element: &Element) {
    match element {
        Element::Note(note) => write_note(out, note),
        Element::Chord(chord) => write_chord(out, chord),
        Element::Rest(rest) => write_rest(out, rest),
        Element::Bar(bar) => out.push_str(bar.as_abc()),
        Element::Tuplet(tuplet) => {
            let timed = tuplet
                .elements
                .iter()
                .filter(|e| {
                    matches!(
                        e,
                        Element::Note(_) | Element::Chord(_) | Element::Rest(_) | Element::Tuplet(_)
                    )
                })
                .count();
            let _ = write!(out, "({}:{}:{}", tuplet.p, tuplet.q, timed);
            for inner in &tuplet.elements {
                write_element(out, inner);
            }
        }
        Element::BrokenRhythm(broken) => {
            let mark = if broken.first_longer { '>' } else { '<' };
            for _ in 0..broken.count.max(1) {
                out.push(mark);
            }
        }
        Element::GraceNotes(notes) => {
            out.push('{');
            for note in notes {
                write_note(out, note);
            }
            out.push('}');
        }
        Element::ChordSymbol(symbol) => {
            let _ = write!(out, "\"{}\"", symbol);
        }
        Element::InlineField(field) => {
            let _ = write!(out, "[{}:{}]", field.field_type, field.value);
        }
        Element::Decoration(name) if name.chars().count() == 1 => out.push_str(name),
        Element::Decoration(name) => {
            let _ = write!(out, "!{}!", name);
        }
        Element::Slur(SlurBoundary::Start) => out.push('('),
        Element::Slur(SlurBoundary::End) => out.push(')'),
        Element::VoiceSwitch(id) => {
            let _ = write!(out, "[V:{}]", id);
        }
        Element::Space => out.push(' '),
        Element::LineBreak => out.push('\n'),
    }
}

fn write_note(out: &mut String, note: &Note) {
    if let Some(accidental) = note.accidental {
        out.push_str(accidental.as_abc());
    }

    let letter = note.pitch.letter();
    if note.octave >= 1 {
        out.push(letter.to_ascii_lowercase());
        for _ in 1..note.octave {
            out.push('\'');
        }
    } else {
        out.push(letter);
        for _ in note.octave..0 {
            out.push(',');
        }
    }

    write_duration(out, note.duration);
    if note.tie {
        out.push('-');
    }
}

fn write_chord(out: &mut String, chord: &Chord) {
    out.push('[');
    for note in &chord.notes {
        write_note(out, note);
    }
    out.push(']');
    write_duration(out, chord.duration);
}

fn write_rest(out: &mut String, rest: &Rest) {
    if let Some(bars) = rest.multi_measure {
        let _ = write!(out, "Z{}", bars);
        return;
    }
    out.push(if rest.visible { 'z' } else { 'x' });
    write_duration(out, rest.duration);
}

fn write_duration(out: &mut String, duration: Duration) {
    match (duration.numerator, duration.denominator) {
        (n, d) if n == d => {}
        (n, 1) => {
            let _ = write!(out, "{}", n);
        }
        (1, 2) => out.push('/'),
        (1, d) => {
            let _ = write!(out, "/{}", d);
        }
        (n, d) => {
            let _ = write!(out, "{}/{}", n, d);
        }
    }
}
