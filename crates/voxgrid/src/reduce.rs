//! Fixed-width voice reduction for a single grid index.
//!
//! Frames with at most `target` notes are padded with absent slots. Denser
//! frames are reduced to a four-voice triad: a pitch doubled at the octave
//! marks the chord as voiced, everything below the doubled pitch is folded
//! up an octave, and a short list of triad shapes is tried in a fixed order.

use serde::{Deserialize, Serialize};

/// A sounding pitch tagged with the track it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceNote {
    pub track: usize,
    pub pitch: u8,
}

/// One voice slot of a frame; `None` means no note in this voice.
pub type Slot = Option<VoiceNote>;

/// Why a dense frame could not be reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DegenerateChord {
    #[error("no pitch is doubled at the octave")]
    NoDoubledTone,
    #[error("no root-position or inverted triad matches")]
    NoTriadMatch,
}

/// Which chord tone the matched shape treats as doubled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordPosition {
    Root,
    Fifth,
    Third,
}

/// A matched triad plus its root one octave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triad {
    pub position: ChordPosition,
    pub voices: [VoiceNote; 4],
}

/// Interval from the lowest pitch to the middle tone, then the allowed
/// intervals from the middle tone to the top tone.
type Shape = (u8, &'static [u8]);

const ROOT_SHAPES: &[Shape] = &[(4, &[3, 4]), (3, &[4, 3])];
const FIFTH_SHAPES: &[Shape] = &[(5, &[4, 3]), (6, &[3])];
const THIRD_SHAPES: &[Shape] = &[(3, &[5, 6]), (4, &[5])];

type TriadMatcher = fn(&[VoiceNote]) -> Option<[VoiceNote; 4]>;

fn match_root(sorted: &[VoiceNote]) -> Option<[VoiceNote; 4]> {
    match_shapes(sorted, ROOT_SHAPES)
}

fn match_fifth(sorted: &[VoiceNote]) -> Option<[VoiceNote; 4]> {
    match_shapes(sorted, FIFTH_SHAPES)
}

fn match_third(sorted: &[VoiceNote]) -> Option<[VoiceNote; 4]> {
    match_shapes(sorted, THIRD_SHAPES)
}

/// Tried in order; the first hit wins.
const TRIAD_MATCHERS: [(ChordPosition, TriadMatcher); 3] = [
    (ChordPosition::Root, match_root),
    (ChordPosition::Fifth, match_fifth),
    (ChordPosition::Third, match_third),
];

/// Scan upward from the lowest pitch for a middle and a top tone.
fn match_shapes(sorted: &[VoiceNote], shapes: &[Shape]) -> Option<[VoiceNote; 4]> {
    let (&root, rest) = sorted.split_first()?;
    let octave = root.pitch.checked_add(12).filter(|&p| p <= 127)?;

    for (i, &middle) in rest.iter().enumerate() {
        for &(to_middle, to_top) in shapes {
            if middle.pitch != root.pitch + to_middle {
                continue;
            }
            let top = rest[i + 1..]
                .iter()
                .find(|n| {
                    to_top
                        .iter()
                        .any(|&step| u16::from(n.pitch) == u16::from(middle.pitch) + u16::from(step))
                });
            if let Some(&top) = top {
                return Some([
                    root,
                    middle,
                    top,
                    VoiceNote {
                        track: root.track,
                        pitch: octave,
                    },
                ]);
            }
        }
    }
    None
}

fn sort_by_pitch(voices: &mut [VoiceNote]) {
    voices.sort_by(|a, b| a.pitch.cmp(&b.pitch).then(a.track.cmp(&b.track)));
}

/// Position of the lowest pitch that also sounds an octave higher.
fn doubled_index(sorted: &[VoiceNote]) -> Option<usize> {
    sorted.iter().position(|low| {
        sorted
            .iter()
            .any(|high| u16::from(high.pitch) == u16::from(low.pitch) + 12)
    })
}

/// Find the triad hidden in a dense frame.
pub fn find_triad(voices: &[VoiceNote]) -> Result<Triad, DegenerateChord> {
    let mut sorted = voices.to_vec();
    sort_by_pitch(&mut sorted);

    let doubled = doubled_index(&sorted).ok_or(DegenerateChord::NoDoubledTone)?;
    for voice in &mut sorted[..doubled] {
        voice.pitch += 12;
    }
    sort_by_pitch(&mut sorted);

    TRIAD_MATCHERS
        .iter()
        .find_map(|&(position, matcher)| matcher(&sorted).map(|voices| Triad { position, voices }))
        .ok_or(DegenerateChord::NoTriadMatch)
}

/// Bring a frame to exactly `target` slots.
///
/// Sparse frames keep their order and duplicates. Dense frames go through
/// [`find_triad`]; the four triad voices are then cut or padded to `target`.
pub fn reduce_chord(voices: &[VoiceNote], target: usize) -> Result<Vec<Slot>, DegenerateChord> {
    let mut slots: Vec<Slot> = if voices.len() <= target {
        voices.iter().copied().map(Some).collect()
    } else {
        find_triad(voices)?.voices.into_iter().map(Some).collect()
    };
    slots.resize(target, None);
    Ok(slots)
}
