//! Music body parsing for ABC notation.

use winnow::prelude::*;

use crate::ast::{Bar, Element, InfoField, Note, SlurBoundary, Tuplet};
use crate::feedback::FeedbackCollector;

use super::header::{split_field, split_line};
use super::note::{parse_broken_rhythm, parse_chord, parse_chord_symbol, parse_note, parse_rest};

/// Single-character decorations that never start a note.
const SHORT_DECORATIONS: [char; 11] = ['.', '~', 'H', 'L', 'M', 'O', 'P', 'S', 'T', 'u', 'v'];

/// Skip whitespace (spaces and tabs) at the start of input, returning count
fn skip_spaces(input: &mut &str) -> usize {
    let start_len = input.len();
    *input = input.trim_start_matches([' ', '\t']);
    start_len - input.len()
}

/// Parse the body section of an ABC tune.
///
/// The collector's current line is taken as the line of the first body line.
pub fn parse_body(input: &str, collector: &mut FeedbackCollector) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut remaining = input;
    let mut line_num = collector.line();

    while !remaining.is_empty() {
        let (line, rest) = split_line(remaining);
        collector.set_line(line_num);
        parse_line(line, &mut elements, collector);
        remaining = rest;
        line_num += 1;
    }

    elements
}

/// Parse one line of music, appending its elements.
fn parse_line(line: &str, elements: &mut Vec<Element>, collector: &mut FeedbackCollector) {
    // Field lines inside the body (V:2, M:3/4, K:G, T:Part B); "G:|" is music
    if let Some((field_type, value)) = split_field(line.trim_start())
        .filter(|(_, value)| !value.starts_with(['|', ':']))
    {
        if field_type == 'V' {
            elements.push(Element::VoiceSwitch(voice_id(value)));
        } else {
            elements.push(Element::InlineField(InfoField {
                field_type,
                value: value.to_string(),
            }));
        }
        return;
    }

    let mut input = line;
    let mut continued = false;

    while !input.is_empty() {
        if skip_spaces(&mut input) > 0 {
            elements.push(Element::Space);
            continue;
        }

        if input.starts_with('%') {
            break;
        }

        // A trailing backslash joins this line with the next
        if input.trim_end() == "\\" {
            continued = true;
            break;
        }

        if let Some(element) = try_parse_element(&mut input, collector) {
            elements.push(element);
        } else if let Some(c) = input.chars().next() {
            collector.warning(format!("Skipping unknown character '{}'", c));
            input = &input[c.len_utf8()..];
        }
    }

    if !continued {
        elements.push(Element::LineBreak);
    }
}

fn voice_id(value: &str) -> String {
    value.split_whitespace().next().unwrap_or("1").to_string()
}

/// Try to parse a single element from the input
fn try_parse_element(input: &mut &str, collector: &mut FeedbackCollector) -> Option<Element> {
    // Inline fields [K:G] and voice switches [V:2]
    if input.starts_with('[') {
        if let Some(field) = try_parse_inline_field(input) {
            if field.field_type == 'V' {
                return Some(Element::VoiceSwitch(voice_id(&field.value)));
            }
            return Some(Element::InlineField(field));
        }
    }

    // Bar lines before chords: "[|" and "[1" start with a bracket too
    if let Some(bar) = try_parse_bar(input) {
        return Some(Element::Bar(bar));
    }

    if let Some(tuplet) = try_parse_tuplet(input, collector) {
        return Some(Element::Tuplet(tuplet));
    }

    if input.starts_with('"') {
        if let Ok(symbol) = parse_chord_symbol.parse_next(input) {
            return Some(Element::ChordSymbol(symbol));
        }
        collector.warning("Unterminated chord symbol");
        *input = "";
        return None;
    }

    if input.starts_with('[') {
        if let Ok(chord) = parse_chord.parse_next(input) {
            return Some(Element::Chord(chord));
        }
    }

    if input.starts_with(['z', 'x', 'Z']) {
        if let Ok(rest) = parse_rest.parse_next(input) {
            return Some(Element::Rest(rest));
        }
    }

    if input.starts_with(['>', '<']) {
        if let Ok(broken) = parse_broken_rhythm.parse_next(input) {
            return Some(Element::BrokenRhythm(broken));
        }
    }

    if input.starts_with('{') {
        return try_parse_grace_notes(input).map(Element::GraceNotes);
    }

    if let Some(dec) = try_parse_decoration(input) {
        return Some(Element::Decoration(dec));
    }

    if let Some(rest) = input.strip_prefix('(') {
        *input = rest;
        return Some(Element::Slur(SlurBoundary::Start));
    }
    if let Some(rest) = input.strip_prefix(')') {
        *input = rest;
        return Some(Element::Slur(SlurBoundary::End));
    }

    // Backquotes are beaming hints with no musical meaning
    if let Some(rest) = input.strip_prefix('`') {
        *input = rest;
        return Some(Element::Space);
    }

    // Note comes last as it is the most general single-character form
    if let Ok(note) = parse_note.parse_next(input) {
        return Some(Element::Note(note));
    }

    None
}

/// Try to parse a bar line
fn try_parse_bar(input: &mut &str) -> Option<Bar> {
    // Longer patterns first
    const BARS: [(&str, Bar); 13] = [
        (":|2", Bar::SecondEnding),
        (":|]", Bar::RepeatEnd),
        ("::", Bar::RepeatBoth),
        (":|", Bar::RepeatEnd),
        ("|]", Bar::End),
        ("[|", Bar::Start),
        ("||", Bar::Double),
        ("|:", Bar::RepeatStart),
        ("|1", Bar::FirstEnding),
        ("|2", Bar::SecondEnding),
        ("[1", Bar::FirstEnding),
        ("[2", Bar::SecondEnding),
        ("|", Bar::Single),
    ];

    for (text, bar) in BARS {
        if let Some(rest) = input.strip_prefix(text) {
            *input = rest;
            return Some(bar);
        }
    }

    None
}

/// Default `q` for `(p` when no explicit ratio is given
fn default_tuplet_q(p: u8) -> u8 {
    match p {
        2 | 4 | 8 => 3,
        _ => 2,
    }
}

/// Try to parse a tuplet: `(3abc` or `(p:q:r`
fn try_parse_tuplet(input: &mut &str, collector: &mut FeedbackCollector) -> Option<Tuplet> {
    let after_paren = input.strip_prefix('(')?;
    if !after_paren.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    *input = after_paren;

    let p = take_number(input).unwrap_or(3).max(1);
    let mut q = default_tuplet_q(p);
    let mut r = p;

    if let Some(rest) = input.strip_prefix(':') {
        *input = rest;
        q = take_number(input).unwrap_or(q);
        if let Some(rest) = input.strip_prefix(':') {
            *input = rest;
            r = take_number(input).unwrap_or(p);
        }
    }

    if q == 0 {
        collector.warning(format!("Tuplet ({}:0 has no length, assuming ({}", p, p));
        q = default_tuplet_q(p);
    }

    // r timed elements belong to the tuplet; spaces and ornaments ride along
    let mut elements = Vec::new();
    let mut timed = 0;
    while timed < r {
        skip_spaces(input);
        if input.is_empty() || input.starts_with('|') {
            break;
        }
        match try_parse_element(input, collector) {
            Some(elem) => {
                if matches!(
                    elem,
                    Element::Note(_) | Element::Chord(_) | Element::Rest(_) | Element::Tuplet(_)
                ) {
                    timed += 1;
                }
                elements.push(elem);
            }
            None => break,
        }
    }

    if timed < r {
        collector.warning(format!("Tuplet expected {} notes but found {}", r, timed));
    }

    Some(Tuplet { p, q, elements })
}

fn take_number(input: &mut &str) -> Option<u8> {
    let len = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, rest) = input.split_at(len);
    *input = rest;
    digits.parse().ok()
}

/// Try to parse grace notes {g} or {/g}
fn try_parse_grace_notes(input: &mut &str) -> Option<Vec<Note>> {
    let mut inner = input.strip_prefix('{')?;
    inner = inner.strip_prefix('/').unwrap_or(inner);

    let mut notes = Vec::new();
    while !inner.starts_with('}') && !inner.is_empty() {
        if let Ok(note) = parse_note.parse_next(&mut inner) {
            notes.push(note);
        } else if let Some(c) = inner.chars().next() {
            inner = &inner[c.len_utf8()..];
        }
    }

    *input = inner.strip_prefix('}').unwrap_or(inner);
    Some(notes)
}

/// Try to parse an inline field [M:3/4]
fn try_parse_inline_field(input: &mut &str) -> Option<InfoField> {
    let end = input.find(']')?;
    let content = &input[1..end];
    let (field_type, value) = split_field(content)?;
    let field = InfoField {
        field_type,
        value: value.to_string(),
    };
    *input = &input[end + 1..];
    Some(field)
}

/// Try to parse a decoration: a short symbol, `!name!` or `+name+`
fn try_parse_decoration(input: &mut &str) -> Option<String> {
    let first = input.chars().next()?;

    if SHORT_DECORATIONS.contains(&first) {
        *input = &input[first.len_utf8()..];
        return Some(first.to_string());
    }

    if first == '!' || first == '+' {
        let end = input[1..].find(first)?;
        let name = input[1..end + 1].to_string();
        *input = &input[end + 2..];
        return Some(name);
    }

    None
}
