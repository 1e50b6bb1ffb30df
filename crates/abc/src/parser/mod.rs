//! ABC notation parser using winnow.
//!
//! The parser is designed to be generous - it will attempt to continue
//! parsing even when encountering issues, collecting feedback for the user.

mod body;
pub(crate) mod header;
pub(crate) mod key;
mod note;

use crate::ast::{Element, Tune, Voice};
use crate::feedback::{FeedbackCollector, ParseResult};

/// Parse ABC notation into a Tune AST.
pub fn parse(input: &str) -> ParseResult<Tune> {
    parse_at(input, 1)
}

/// Parse a single tune whose first line is `first_line` of a larger file.
fn parse_at(input: &str, first_line: usize) -> ParseResult<Tune> {
    let mut collector = FeedbackCollector::starting_at(first_line);

    let (remaining, header) = header::parse_header(input, &mut collector);
    let elements = body::parse_body(remaining, &mut collector);

    let tune = Tune {
        header,
        voices: route_elements_to_voices(elements),
    };

    ParseResult::new(tune, collector.into_feedback())
}

/// Parse a file that may hold several tunes, each starting at an `X:` line.
///
/// Text before the first `X:` line (a file header) is skipped. A file with no
/// `X:` line at all is parsed as one tune.
pub fn parse_collection(input: &str) -> Vec<ParseResult<Tune>> {
    let starts: Vec<(usize, usize)> = line_offsets(input)
        .filter(|(_, _, line)| line.starts_with("X:"))
        .map(|(offset, line_num, _)| (offset, line_num))
        .collect();

    if starts.is_empty() {
        return if input.trim().is_empty() {
            Vec::new()
        } else {
            vec![parse(input)]
        };
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &(offset, line_num))| {
            let end = starts.get(i + 1).map(|&(o, _)| o).unwrap_or(input.len());
            parse_at(&input[offset..end], line_num)
        })
        .collect()
}

/// Byte offset, 1-based line number and text of every line.
fn line_offsets(input: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut offset = 0;
    input.split_inclusive('\n').enumerate().map(move |(i, line)| {
        let start = offset;
        offset += line.len();
        (start, i + 1, line)
    })
}

/// Route parsed elements to their respective voices based on VoiceSwitch markers.
///
/// Voices keep the order in which they first appear. Elements before any
/// switch belong to the first voice.
fn route_elements_to_voices(elements: Vec<Element>) -> Vec<Voice> {
    let mut voices = vec![Voice::default()];
    let mut current = 0;

    for element in elements {
        match element {
            Element::VoiceSwitch(id) => {
                current = match voices.iter().position(|v| v.id.as_deref() == Some(id.as_str())) {
                    Some(index) => index,
                    None if voices.len() == 1 && voices[0].id.is_none() => {
                        voices[0].id = Some(id);
                        0
                    }
                    None => {
                        voices.push(Voice {
                            id: Some(id),
                            elements: Vec::new(),
                        });
                        voices.len() - 1
                    }
                };
            }
            other => voices[current].elements.push(other),
        }
    }

    voices
}
