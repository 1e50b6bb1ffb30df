//! Key signature parsing for ABC notation.

use crate::ast::{Accidental, Key, Mode, NoteName};
use crate::feedback::FeedbackCollector;

/// Parse a K: field value (e.g., "G", "Am", "D dorian", "F#m", "Bb").
///
/// Returns `None` for `K:none`, an empty field, or a root that is not a
/// note letter: the tune then carries no usable key annotation.
pub fn parse_key_field(value: &str, collector: &mut FeedbackCollector) -> Option<Key> {
    let trimmed = value.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return None;
    }

    // Highland pipe keys have a fixed signature but no tonal centre we can use
    if trimmed.starts_with("HP") || trimmed.starts_with("Hp") {
        collector.warning(format!("Bagpipe key '{}' treated as no key", trimmed));
        return None;
    }

    let mut chars = trimmed.chars().peekable();

    let root = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => NoteName::C,
        Some('D') => NoteName::D,
        Some('E') => NoteName::E,
        Some('F') => NoteName::F,
        Some('G') => NoteName::G,
        Some('A') => NoteName::A,
        Some('B') => NoteName::B,
        Some(c) => {
            collector.warning(format!("Invalid key root '{}', ignoring K: field", c));
            return None;
        }
        None => return None,
    };

    // No mode name starts with 'b', so a 'b' right after the root is a flat
    let accidental = match chars.peek() {
        Some('#') => {
            chars.next();
            Some(Accidental::Sharp)
        }
        Some('b') => {
            chars.next();
            Some(Accidental::Flat)
        }
        _ => None,
    };

    let remaining: String = chars.collect();
    let mode_word = remaining
        .split_whitespace()
        .next()
        .filter(|w| !w.contains('='))
        .unwrap_or("");

    let mode = Mode::parse(mode_word).unwrap_or_else(|| {
        collector.warning(format!("Unknown mode '{}', assuming major", mode_word));
        Mode::Major
    });

    Some(Key::new(root, accidental, mode))
}

/// Accidentals implied by a key signature, keyed by note letter.
pub fn key_accidentals(key: &Key) -> Vec<(NoteName, Accidental)> {
    const SHARP_ORDER: [NoteName; 7] = [
        NoteName::F,
        NoteName::C,
        NoteName::G,
        NoteName::D,
        NoteName::A,
        NoteName::E,
        NoteName::B,
    ];
    const FLAT_ORDER: [NoteName; 7] = [
        NoteName::B,
        NoteName::E,
        NoteName::A,
        NoteName::D,
        NoteName::G,
        NoteName::C,
        NoteName::F,
    ];

    let count = signature_count(key);
    if count >= 0 {
        SHARP_ORDER
            .iter()
            .take(count as usize)
            .map(|&n| (n, Accidental::Sharp))
            .collect()
    } else {
        FLAT_ORDER
            .iter()
            .take(count.unsigned_abs() as usize)
            .map(|&n| (n, Accidental::Flat))
            .collect()
    }
}

/// Sharps (positive) or flats (negative) in the signature of `key`.
fn signature_count(key: &Key) -> i8 {
    let major = match (key.root, key.accidental) {
        (NoteName::C, None) => 0,
        (NoteName::G, None) => 1,
        (NoteName::D, None) => 2,
        (NoteName::A, None) => 3,
        (NoteName::E, None) => 4,
        (NoteName::B, None) => 5,
        (NoteName::F, Some(Accidental::Sharp)) => 6,
        (NoteName::C, Some(Accidental::Sharp)) => 7,
        (NoteName::G, Some(Accidental::Sharp)) => 8,
        (NoteName::D, Some(Accidental::Sharp)) => 9,
        (NoteName::A, Some(Accidental::Sharp)) => 10,
        (NoteName::F, None) => -1,
        (NoteName::B, Some(Accidental::Flat)) => -2,
        (NoteName::E, Some(Accidental::Flat)) => -3,
        (NoteName::A, Some(Accidental::Flat)) => -4,
        (NoteName::D, Some(Accidental::Flat)) => -5,
        (NoteName::G, Some(Accidental::Flat)) => -6,
        (NoteName::C, Some(Accidental::Flat)) => -7,
        (NoteName::F, Some(Accidental::Flat)) => -8,
        _ => 0,
    };

    (major + key.mode.signature_offset()).clamp(-7, 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> Option<Key> {
        let mut collector = FeedbackCollector::new();
        parse_key_field(value, &mut collector)
    }

    #[test]
    fn test_parse_simple_key() {
        let k = key("G").unwrap();
        assert_eq!(k.root, NoteName::G);
        assert_eq!(k.accidental, None);
        assert_eq!(k.mode, Mode::Major);
    }

    #[test]
    fn test_parse_minor_and_sharp_keys() {
        let k = key("F#m").unwrap();
        assert_eq!(k.root, NoteName::F);
        assert_eq!(k.accidental, Some(Accidental::Sharp));
        assert_eq!(k.mode, Mode::Minor);

        assert_eq!(key("Am").unwrap().mode, Mode::Minor);
        assert_eq!(key("A minor").unwrap().mode, Mode::Minor);
    }

    #[test]
    fn test_parse_flat_key() {
        let k = key("Bb").unwrap();
        assert_eq!(k.root, NoteName::B);
        assert_eq!(k.accidental, Some(Accidental::Flat));
        assert_eq!(k.mode, Mode::Major);

        let k = key("Bbm").unwrap();
        assert_eq!(k.accidental, Some(Accidental::Flat));
        assert_eq!(k.mode, Mode::Minor);
    }

    #[test]
    fn test_parse_modal_key() {
        assert_eq!(key("D dorian").unwrap().mode, Mode::Dorian);
        assert_eq!(key("E mix").unwrap().mode, Mode::Mixolydian);
        assert_eq!(key("Ador").unwrap().mode, Mode::Dorian);
    }

    #[test]
    fn test_clef_words_do_not_change_mode() {
        let k = key("G clef=bass").unwrap();
        assert_eq!(k.root, NoteName::G);
        assert_eq!(k.mode, Mode::Major);
    }

    #[test]
    fn test_missing_keys() {
        assert_eq!(key(""), None);
        assert_eq!(key("none"), None);
        assert_eq!(key("HP"), None);
    }

    #[test]
    fn test_key_accidentals() {
        let d_major = key("D").unwrap();
        assert_eq!(
            key_accidentals(&d_major),
            vec![(NoteName::F, Accidental::Sharp), (NoteName::C, Accidental::Sharp)]
        );

        let d_minor = key("Dm").unwrap();
        assert_eq!(key_accidentals(&d_minor), vec![(NoteName::B, Accidental::Flat)]);

        let a_minor = key("Am").unwrap();
        assert!(key_accidentals(&a_minor).is_empty());
    }
}
