//! Conversion between pieces and fixed-width frame sequences.

use crate::dataset::PitchGrid;
use crate::grid::GridStep;
use crate::note::{Note, Piece, Track};
use crate::reduce::{reduce_chord, Slot};
use crate::snapshot::Snapshot;
use crate::timespan::Timespan;
use std::collections::BTreeMap;
use tracing::debug;

/// Voice slots for one grid index.
pub type Frame = Vec<Slot>;

/// Velocity given to notes rebuilt from frames.
const DECODED_VELOCITY: u8 = 80;

/// Counters from one encoding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub frames: usize,
    pub reduced: usize,
    pub degenerate: usize,
}

/// One frame per grid index from 0 through the last sounding index.
///
/// Indices where nothing sounds become all-absent frames, as do dense
/// indices the chord reducer cannot resolve.
pub fn encode_snapshot(snapshot: &Snapshot, voices: usize) -> (Vec<Frame>, EncodeStats) {
    let mut stats = EncodeStats::default();
    let Some(last) = snapshot.last_index() else {
        return (Vec::new(), stats);
    };

    let frames: Vec<Frame> = (0..=last)
        .map(|index| {
            let sounding = snapshot.voices_at(index);
            if sounding.len() > voices {
                stats.reduced += 1;
            }
            reduce_chord(&sounding, voices).unwrap_or_else(|_| {
                stats.degenerate += 1;
                vec![None; voices]
            })
        })
        .collect();
    stats.frames = frames.len();

    debug!(
        frames = stats.frames,
        reduced = stats.reduced,
        degenerate = stats.degenerate,
        "encoded snapshot"
    );
    (frames, stats)
}

/// Quantize and encode a whole piece.
pub fn encode_piece(piece: &Piece, step: GridStep, voices: usize) -> (Vec<Frame>, EncodeStats) {
    encode_snapshot(&Snapshot::build(piece, step), voices)
}

/// Drop track attribution, keeping only pitches.
pub fn pitch_grid(frames: &[Frame]) -> PitchGrid {
    PitchGrid::new(
        frames
            .iter()
            .map(|frame| frame.iter().map(|slot| slot.map(|v| v.pitch)).collect())
            .collect(),
    )
}

/// Rebuild a piece from frames, one track per source track.
///
/// A voice held over consecutive frames becomes a single note lasting one
/// step per frame.
pub fn decode_frames(frames: &[Frame], step: GridStep) -> Piece {
    let mut pending: Vec<Frame> = frames.to_vec();
    let mut tracks: BTreeMap<usize, Track> = BTreeMap::new();
    for voice in pending.iter().flatten().flatten() {
        tracks
            .entry(voice.track)
            .or_insert_with(|| Track::new(voice.track));
    }

    for moment in 0..pending.len() {
        for slot in 0..pending[moment].len() {
            let Some(voice) = pending[moment][slot].take() else {
                continue;
            };
            let mut held = 1usize;
            for later in pending.iter_mut().skip(moment + 1) {
                match later.iter_mut().find(|s| **s == Some(voice)) {
                    Some(s) => {
                        *s = None;
                        held += 1;
                    }
                    None => break,
                }
            }
            let start = step.time_of(moment as i64);
            let end = step.time_of((moment + held) as i64);
            if let Some(track) = tracks.get_mut(&voice.track) {
                track.notes.push(Note {
                    pitch: voice.pitch,
                    velocity: DECODED_VELOCITY,
                    span: Timespan { start, end },
                });
            }
        }
    }

    Piece::new(tracks.into_values().collect())
}
