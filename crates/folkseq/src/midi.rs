//! Rendering decoded melodies to files.

use std::fs;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use tracing::info;

use crate::error::{Error, Result};
use crate::notation::tune_from_events;
use crate::piece::{Event, EventKind};

pub use warblerconf::OutputFormat;

const TICKS_PER_QUARTER: u16 = 480;
const VELOCITY: u8 = 80;

/// Encode events as a format 0 Standard MIDI File on channel 0.
pub fn events_to_smf(events: &[Event], tempo_bpm: u32) -> Result<Vec<u8>> {
    let header = Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    );
    let micros_per_quarter = 60_000_000 / tempo_bpm.max(1);

    let mut track = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_quarter.min(0xFF_FFFF)))),
    }];

    // Rests accumulate into the delta of the next note on
    let mut pending_delta: u32 = 0;
    for event in events {
        let ticks = (event.duration.max(0.0) * TICKS_PER_QUARTER as f64).round() as u32;
        match event.kind {
            EventKind::Note(pitch) => {
                let key = u7::new(pitch.min(127));
                track.push(TrackEvent {
                    delta: u28::new(pending_delta),
                    kind: TrackEventKind::Midi {
                        channel: u4::new(0),
                        message: MidiMessage::NoteOn {
                            key,
                            vel: u7::new(VELOCITY),
                        },
                    },
                });
                track.push(TrackEvent {
                    delta: u28::new(ticks),
                    kind: TrackEventKind::Midi {
                        channel: u4::new(0),
                        message: MidiMessage::NoteOff {
                            key,
                            vel: u7::new(0),
                        },
                    },
                });
                pending_delta = 0;
            }
            EventKind::Rest => pending_delta += ticks,
        }
    }

    track.push(TrackEvent {
        delta: u28::new(pending_delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header,
        tracks: vec![track],
    };

    let mut buffer = Vec::new();
    smf.write(&mut buffer)
        .map_err(|e| Error::Midi(e.to_string()))?;
    Ok(buffer)
}

/// Write `events` to `path` as MIDI or ABC, creating parent directories.
pub fn write_melody(
    events: &[Event],
    path: &Path,
    format: OutputFormat,
    tempo_bpm: u32,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let bytes = match format {
        OutputFormat::Midi => events_to_smf(events, tempo_bpm)?,
        OutputFormat::Abc => {
            let mut tune = tune_from_events("Generated melody", events);
            tune.header.tempo = Some(abc::Tempo {
                bpm: tempo_bpm.min(u16::MAX as u32) as u16,
                ..abc::Tempo::default()
            });
            abc::to_abc(&tune).into_bytes()
        }
    };

    fs::write(path, bytes).map_err(|e| Error::io(path, e))?;
    info!(path = %path.display(), %format, events = events.len(), "wrote melody");
    Ok(())
}
