//! Note, chord, and rest parsing using winnow combinators.

use winnow::combinator::{alt, opt, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::ast::{Accidental, BrokenRhythm, Chord, Duration, Note, NoteName, Rest};

type PResult<T> = winnow::ModalResult<T>;

/// Parse a note letter and its base octave.
/// Uppercase = octave 0 (middle C octave), lowercase = octave 1
pub fn parse_pitch(input: &mut &str) -> PResult<(NoteName, i8)> {
    let c = one_of(['C', 'D', 'E', 'F', 'G', 'A', 'B', 'c', 'd', 'e', 'f', 'g', 'a', 'b'])
        .parse_next(input)?;
    let octave = if c.is_ascii_lowercase() { 1 } else { 0 };
    let name = match c.to_ascii_uppercase() {
        'C' => NoteName::C,
        'D' => NoteName::D,
        'E' => NoteName::E,
        'F' => NoteName::F,
        'G' => NoteName::G,
        'A' => NoteName::A,
        _ => NoteName::B,
    };
    Ok((name, octave))
}

/// Parse an accidental (^, ^^, _, __, =)
pub fn parse_accidental(input: &mut &str) -> PResult<Accidental> {
    alt((
        "^^".value(Accidental::DoubleSharp),
        "^".value(Accidental::Sharp),
        "__".value(Accidental::DoubleFlat),
        "_".value(Accidental::Flat),
        "=".value(Accidental::Natural),
    ))
    .parse_next(input)
}

/// Parse octave modifiers (', ,) and return the net shift
pub fn parse_octave_modifier(input: &mut &str) -> PResult<i8> {
    let marks: Vec<char> = repeat(0.., one_of(['\'', ','])).parse_next(input)?;
    Ok(marks
        .iter()
        .map(|&m| if m == '\'' { 1i8 } else { -1i8 })
        .sum())
}

/// Parse a duration (2, /2, /, //, 3/2)
pub fn parse_duration(input: &mut &str) -> PResult<Duration> {
    let multiplier: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let numerator: u16 = if multiplier.is_empty() {
        1
    } else {
        multiplier.parse().unwrap_or(1)
    };

    let mut denominator: u16 = 1;
    while let Some(divisor) = opt(parse_divisor).parse_next(input)? {
        // A bare slash halves the length, so "//" is a quarter
        denominator = denominator.saturating_mul(divisor.unwrap_or(2));
    }

    Ok(Duration::new(numerator, denominator))
}

fn parse_divisor(input: &mut &str) -> PResult<Option<u16>> {
    '/'.parse_next(input)?;
    let digits: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    Ok(digits.parse().ok().filter(|&d| d > 0))
}

/// Parse a complete note
pub fn parse_note(input: &mut &str) -> PResult<Note> {
    let accidental = opt(parse_accidental).parse_next(input)?;
    let (pitch, base_octave) = parse_pitch(input)?;
    let octave_mod = parse_octave_modifier(input)?;
    let duration = parse_duration(input)?;
    let tie = opt('-').parse_next(input)?.is_some();

    Ok(Note {
        pitch,
        octave: base_octave + octave_mod,
        accidental,
        duration,
        tie,
    })
}

/// Parse a rest (z, x, Z)
pub fn parse_rest(input: &mut &str) -> PResult<Rest> {
    let rest_char = one_of(['z', 'x', 'Z']).parse_next(input)?;

    if rest_char == 'Z' {
        let count: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        return Ok(Rest {
            duration: Duration::unit(),
            visible: true,
            multi_measure: Some(count.parse().unwrap_or(1)),
        });
    }

    let duration = parse_duration(input)?;
    Ok(Rest {
        duration,
        visible: rest_char == 'z',
        multi_measure: None,
    })
}

/// Parse a chord [CEG]2
pub fn parse_chord(input: &mut &str) -> PResult<Chord> {
    '['.parse_next(input)?;

    let mut notes = Vec::new();
    loop {
        *input = input.trim_start_matches(' ');
        match opt(parse_note).parse_next(input)? {
            Some(note) => notes.push(note),
            None => break,
        }
    }

    ']'.parse_next(input)?;
    let duration = parse_duration(input)?;
    // A trailing tie on the chord ties every note; we only need to consume it
    let _ = opt('-').parse_next(input)?;

    Ok(Chord { notes, duration })
}

/// Parse a chord symbol or annotation in double quotes
pub fn parse_chord_symbol(input: &mut &str) -> PResult<String> {
    '"'.parse_next(input)?;
    let symbol: &str = take_while(0.., |c: char| c != '"').parse_next(input)?;
    '"'.parse_next(input)?;
    Ok(symbol.to_string())
}

/// Parse a broken rhythm marker (>, >>, <, <<)
pub fn parse_broken_rhythm(input: &mut &str) -> PResult<BrokenRhythm> {
    let marks: &str = take_while(1..=3, |c: char| c == '>' || c == '<').parse_next(input)?;
    let first_longer = marks.starts_with('>');
    if marks.chars().any(|c| (c == '>') != first_longer) {
        return Err(winnow::error::ErrMode::Backtrack(
            winnow::error::ContextError::new(),
        ));
    }
    Ok(BrokenRhythm {
        first_longer,
        count: marks.len() as u8,
    })
}
