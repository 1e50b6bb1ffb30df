//! Header field parsing for ABC notation.

use crate::ast::{Header, InfoField, Meter, Tempo, UnitLength};
use crate::feedback::FeedbackCollector;

use super::key::parse_key_field;

/// Parse the header section of an ABC tune.
///
/// Returns the remaining input after the header (starting at the body) and
/// the header itself. The collector's line is left on the first body line.
pub fn parse_header<'a>(input: &'a str, collector: &mut FeedbackCollector) -> (&'a str, Header) {
    let first_line = collector.line();
    let mut header = Header::default();
    let mut remaining = input;
    let mut found_x = false;
    let mut found_k = false;
    let mut line_num = first_line;

    while !remaining.is_empty() {
        let (line, rest) = split_line(remaining);
        collector.set_line(line_num);
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('%') {
            remaining = rest;
            line_num += 1;
            continue;
        }

        let Some((field_char, value)) = split_field(trimmed) else {
            // Not a field line, the body starts here
            if !found_k {
                collector.warning_with_suggestion(
                    "Body started before K: field",
                    "Add a K: field before the music (e.g., K:C for C major)",
                );
            }
            break;
        };

        match field_char {
            'X' => {
                found_x = true;
                header.reference = value.parse().unwrap_or_else(|_| {
                    collector.warning("Invalid X: value, using 1");
                    1
                });
            }
            'T' => {
                if header.title.is_empty() {
                    header.title = value.to_string();
                } else {
                    header.titles.push(value.to_string());
                }
            }
            'M' => header.meter = Some(parse_meter(value, collector)),
            'L' => header.unit_length = Some(parse_unit_length(value, collector)),
            'Q' => header.tempo = Some(parse_tempo(value, collector)),
            'C' => header.composer = Some(value.to_string()),
            'O' => header.origin = Some(value.to_string()),
            'K' => {
                header.key = parse_key_field(value, collector);
                found_k = true;
                remaining = rest;
                line_num += 1;
                break;
            }
            _ => header.other_fields.push(InfoField {
                field_type: field_char,
                value: value.to_string(),
            }),
        }

        remaining = rest;
        line_num += 1;
    }

    collector.set_line(first_line);
    if !found_x {
        collector.warning_with_suggestion(
            "Missing X: field, assuming X:1",
            "Add X:1 at the start of the tune",
        );
    }

    if !found_k {
        collector.warning_with_suggestion(
            "Missing K: field, tune has no key",
            "Add a K: field to specify the key signature",
        );
    }

    if header.meter.is_none() {
        collector.warning_with_suggestion(
            "Missing M: field, assuming 4/4",
            "Add M:4/4 or appropriate meter",
        );
        header.meter = Some(Meter::Simple {
            numerator: 4,
            denominator: 4,
        });
    }

    if header.unit_length.is_none() {
        let inferred = infer_unit_length(&header.meter);
        collector.info(format!(
            "No L: field, inferring L:{}/{}",
            inferred.numerator, inferred.denominator
        ));
        header.unit_length = Some(inferred);
    }

    collector.set_line(line_num);
    (remaining, header)
}

/// Split off the first line, consuming its terminator.
pub(crate) fn split_line(input: &str) -> (&str, &str) {
    match input.find('\n') {
        Some(pos) => (input[..pos].trim_end_matches('\r'), &input[pos + 1..]),
        None => (input, ""),
    }
}

/// Recognise `F:value` where F is an ASCII letter.
pub(crate) fn split_field(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let field = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    if chars.next() != Some(':') {
        return None;
    }
    Some((field, line[2..].trim()))
}

/// Parse meter field value (e.g., "4/4", "C", "C|", "6/8")
pub(crate) fn parse_meter(value: &str, collector: &mut FeedbackCollector) -> Meter {
    let trimmed = value.trim();

    match trimmed {
        "C" => Meter::Common,
        "C|" => Meter::Cut,
        "none" | "free" => Meter::None,
        _ => {
            if let Some((num, den)) = parse_fraction(trimmed) {
                Meter::Simple {
                    numerator: num,
                    denominator: den,
                }
            } else {
                collector.warning(format!("Invalid meter '{}', assuming 4/4", trimmed));
                Meter::Simple {
                    numerator: 4,
                    denominator: 4,
                }
            }
        }
    }
}

/// Parse unit length field value (e.g., "1/8", "1/16")
pub(crate) fn parse_unit_length(value: &str, collector: &mut FeedbackCollector) -> UnitLength {
    match parse_fraction(value.trim()) {
        Some((num, den)) if num > 0 && den > 0 => UnitLength {
            numerator: num,
            denominator: den,
        },
        _ => {
            collector.warning(format!("Invalid unit length '{}', assuming 1/8", value));
            UnitLength::default()
        }
    }
}

/// Parse tempo field value (e.g., "1/4=120", "120", "\"Allegro\" 1/4=120")
fn parse_tempo(value: &str, collector: &mut FeedbackCollector) -> Tempo {
    let trimmed = value.trim();

    let (text, rest) = match trimmed.strip_prefix('"').and_then(|s| s.split_once('"')) {
        Some((text, rest)) => (Some(text.to_string()), rest.trim()),
        None => (None, trimmed),
    };

    if let Some((beat_part, bpm_part)) = rest.split_once('=') {
        let beat_unit = parse_fraction(beat_part.trim()).unwrap_or_else(|| {
            collector.warning("Invalid tempo beat unit, assuming 1/4");
            (1, 4)
        });
        let bpm = bpm_part.trim().parse().unwrap_or_else(|_| {
            collector.warning("Invalid BPM, assuming 120");
            120
        });
        Tempo {
            beat_unit,
            bpm,
            text,
        }
    } else if let Ok(bpm) = rest.parse::<u16>() {
        Tempo {
            beat_unit: (1, 4),
            bpm,
            text,
        }
    } else if text.is_some() && rest.is_empty() {
        // Text-only tempo like Q:"Slow"
        Tempo {
            text,
            ..Tempo::default()
        }
    } else {
        collector.warning(format!("Invalid tempo '{}', assuming 120 BPM", trimmed));
        Tempo {
            text,
            ..Tempo::default()
        }
    }
}

/// Parse a fraction like "4/4" or "1/8"
fn parse_fraction(s: &str) -> Option<(u8, u8)> {
    let (num, den) = s.split_once('/')?;
    Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
}

/// Infer unit length from meter: below 3/4 the default unit is a sixteenth
fn infer_unit_length(meter: &Option<Meter>) -> UnitLength {
    match meter {
        Some(Meter::Simple {
            numerator,
            denominator,
        }) if *denominator > 0 && (*numerator as f32 / *denominator as f32) < 0.75 => {
            UnitLength {
                numerator: 1,
                denominator: 16,
            }
        }
        _ => UnitLength::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meter_variants() {
        let mut collector = FeedbackCollector::new();
        assert_eq!(parse_meter("C", &mut collector), Meter::Common);
        assert_eq!(parse_meter("C|", &mut collector), Meter::Cut);
        assert_eq!(
            parse_meter("6/8", &mut collector),
            Meter::Simple {
                numerator: 6,
                denominator: 8
            }
        );
        assert!(collector.into_feedback().is_empty());
    }

    #[test]
    fn test_parse_meter_invalid_warns() {
        let mut collector = FeedbackCollector::new();
        assert_eq!(
            parse_meter("seven", &mut collector),
            Meter::Simple {
                numerator: 4,
                denominator: 4
            }
        );
        assert_eq!(collector.into_feedback().len(), 1);
    }

    #[test]
    fn test_parse_tempo_forms() {
        let mut collector = FeedbackCollector::new();
        let tempo = parse_tempo("1/4=120", &mut collector);
        assert_eq!(tempo.bpm, 120);
        assert_eq!(tempo.beat_unit, (1, 4));

        let tempo = parse_tempo("\"Allegro\" 3/8=144", &mut collector);
        assert_eq!(tempo.bpm, 144);
        assert_eq!(tempo.beat_unit, (3, 8));
        assert_eq!(tempo.text, Some("Allegro".to_string()));

        let tempo = parse_tempo("100", &mut collector);
        assert_eq!(tempo.bpm, 100);
        assert!(!collector.has_errors());
    }

    #[test]
    fn test_infer_unit_length() {
        let sixteenth = UnitLength {
            numerator: 1,
            denominator: 16,
        };
        let two_four = Some(Meter::Simple {
            numerator: 2,
            denominator: 4,
        });
        let six_eight = Some(Meter::Simple {
            numerator: 6,
            denominator: 8,
        });
        assert_eq!(infer_unit_length(&two_four), sixteenth);
        assert_eq!(infer_unit_length(&six_eight), UnitLength::default());
        assert_eq!(infer_unit_length(&Some(Meter::Common)), UnitLength::default());
    }

    #[test]
    fn test_header_stops_after_key() {
        let mut collector = FeedbackCollector::new();
        let (rest, header) = parse_header("X:3\nT:Reel\nO:Ireland\nK:Ador\nABcd|\n", &mut collector);
        assert_eq!(header.reference, 3);
        assert_eq!(header.origin.as_deref(), Some("Ireland"));
        assert_eq!(rest, "ABcd|\n");
        assert_eq!(collector.line(), 5);
    }

    #[test]
    fn test_header_without_key_has_none() {
        let mut collector = FeedbackCollector::new();
        let (_, header) = parse_header("X:1\nT:Untitled\n", &mut collector);
        assert_eq!(header.key, None);
        let feedback = collector.into_feedback();
        assert!(feedback.iter().any(|f| f.message.contains("K:")));
    }

    #[test]
    fn test_split_field() {
        assert_eq!(split_field("T: Title "), Some(('T', "Title")));
        assert_eq!(split_field("|:ABc"), None);
        assert_eq!(split_field("A"), None);
    }
}
