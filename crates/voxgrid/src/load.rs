//! Standard MIDI file loading into seconds-based pieces.

use crate::note::{Note, Piece, Track};
use crate::timespan::Timespan;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const DEFAULT_TEMPO: u32 = 500_000;
const DRUM_CHANNEL: u8 = 9;

/// A point where the tempo changes, with the elapsed time up to it.
#[derive(Debug, Clone, Copy)]
struct TempoSegment {
    tick: u64,
    seconds: f64,
    micros_per_beat: u32,
}

/// Tick to seconds conversion for one file.
#[derive(Debug, Clone)]
enum Clock {
    Metrical {
        ppq: f64,
        segments: Vec<TempoSegment>,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl Clock {
    fn from_smf(smf: &Smf) -> Self {
        match smf.header.timing {
            Timing::Metrical(ticks) => {
                let ppq = f64::from(ticks.as_int().max(1));
                let mut changes: Vec<(u64, u32)> = Vec::new();
                for track in &smf.tracks {
                    let mut tick = 0u64;
                    for event in track {
                        tick += u64::from(event.delta.as_int());
                        if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                            changes.push((tick, tempo.as_int()));
                        }
                    }
                }
                // Stable sort keeps the last change written at a tick last.
                changes.sort_by_key(|&(tick, _)| tick);

                let mut segments = vec![TempoSegment {
                    tick: 0,
                    seconds: 0.0,
                    micros_per_beat: DEFAULT_TEMPO,
                }];
                for (tick, micros_per_beat) in changes {
                    let Some(last) = segments.last().copied() else {
                        continue;
                    };
                    let seconds = last.seconds + span_seconds(tick - last.tick, last, ppq);
                    if tick == last.tick {
                        segments.pop();
                    }
                    segments.push(TempoSegment {
                        tick,
                        seconds,
                        micros_per_beat,
                    });
                }
                Clock::Metrical { ppq, segments }
            }
            Timing::Timecode(fps, subframe) => Clock::Timecode {
                ticks_per_second: f64::from(fps.as_f32()) * f64::from(subframe.max(1)),
            },
        }
    }

    fn seconds(&self, tick: u64) -> f64 {
        match self {
            Clock::Metrical { ppq, segments } => {
                let at = segments.partition_point(|s| s.tick <= tick);
                match at.checked_sub(1).and_then(|i| segments.get(i)) {
                    Some(seg) => seg.seconds + span_seconds(tick - seg.tick, *seg, *ppq),
                    None => 0.0,
                }
            }
            Clock::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
        }
    }
}

fn span_seconds(ticks: u64, segment: TempoSegment, ppq: f64) -> f64 {
    ticks as f64 * f64::from(segment.micros_per_beat) / 1_000_000.0 / ppq
}

/// Tick-based note before conversion to seconds.
#[derive(Debug, Clone, Copy)]
struct RawNote {
    onset: u64,
    offset: u64,
    pitch: u8,
    velocity: u8,
}

/// Notes gathered for one (track, channel, program) combination.
#[derive(Debug)]
struct Part {
    name: Option<String>,
    program: u8,
    is_drum: bool,
    notes: Vec<RawNote>,
}

/// Parse Standard MIDI File bytes into a piece.
///
/// Each combination of file track, channel and program becomes one track,
/// in order of first note. Notes still held at the end of a file track are
/// closed there.
pub fn piece_from_smf_bytes(bytes: &[u8]) -> crate::Result<Piece> {
    let smf = Smf::parse(bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    let clock = Clock::from_smf(&smf);

    let mut parts: Vec<Part> = Vec::new();
    let mut part_of: HashMap<(usize, u8, u8), usize> = HashMap::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut tick = 0u64;
        let mut name: Option<String> = None;
        let mut programs = [0u8; 16];
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8, u8)>> = HashMap::new();
        let mut finished: Vec<(u8, u8, RawNote)> = Vec::new();

        for event in track {
            tick += u64::from(event.delta.as_int());
            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    name = Some(String::from_utf8_lossy(bytes).into_owned());
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::ProgramChange { program } => {
                            programs[usize::from(ch)] = program.as_int();
                        }
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending.entry((ch, key.as_int())).or_default().push((
                                tick,
                                vel.as_int(),
                                programs[usize::from(ch)],
                            ));
                        }
                        // Velocity-zero NoteOn is a NoteOff.
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            let key = (ch, key.as_int());
                            if let Some((onset, velocity, program)) =
                                pending.get_mut(&key).and_then(Vec::pop)
                            {
                                finished.push((
                                    ch,
                                    program,
                                    RawNote {
                                        onset,
                                        offset: tick,
                                        pitch: key.1,
                                        velocity,
                                    },
                                ));
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        for ((ch, pitch), stack) in pending {
            for (onset, velocity, program) in stack {
                finished.push((
                    ch,
                    program,
                    RawNote {
                        onset,
                        offset: tick,
                        pitch,
                        velocity,
                    },
                ));
            }
        }
        finished.sort_by_key(|(ch, _, n)| (n.onset, n.pitch, *ch));

        for (ch, program, raw) in finished {
            let slot = *part_of.entry((track_index, ch, program)).or_insert_with(|| {
                parts.push(Part {
                    name: name.clone(),
                    program,
                    is_drum: ch == DRUM_CHANNEL,
                    notes: Vec::new(),
                });
                parts.len() - 1
            });
            if let Some(part) = parts.get_mut(slot) {
                part.notes.push(raw);
            }
        }
    }

    let tracks: Vec<Track> = parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| Track {
            index,
            name: part.name,
            program: part.program,
            is_drum: part.is_drum,
            notes: part
                .notes
                .iter()
                .map(|raw| Note {
                    pitch: raw.pitch,
                    velocity: raw.velocity,
                    span: Timespan {
                        start: clock.seconds(raw.onset),
                        end: clock.seconds(raw.offset),
                    },
                })
                .collect(),
        })
        .collect();

    let piece = Piece::new(tracks);
    debug!(
        tracks = piece.tracks.len(),
        notes = piece.note_count(),
        duration = piece.duration(),
        "loaded midi"
    );
    Ok(piece)
}

/// Read and parse a MIDI file.
pub fn load_piece(path: &Path) -> crate::Result<Piece> {
    let bytes = std::fs::read(path).map_err(|e| crate::Error::UnreadableSource {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    piece_from_smf_bytes(&bytes).map_err(|e| crate::Error::UnreadableSource {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
