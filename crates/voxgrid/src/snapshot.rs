use crate::grid::{grid_points, GridStep};
use crate::note::{Note, Piece};
use crate::reduce::VoiceNote;
use std::collections::BTreeMap;
use tracing::debug;

/// Which notes sound at each grid index, bucketed per track.
///
/// Every stored index carries one bucket per track of the source piece, in
/// piece order. Indices where nothing sounds are not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    track_indices: Vec<usize>,
    frames: BTreeMap<i64, Vec<Vec<Note>>>,
}

impl Snapshot {
    /// Quantize every track of `piece` onto the grid.
    ///
    /// Notes shorter than one step are left out.
    pub fn build(piece: &Piece, step: GridStep) -> Self {
        let track_count = piece.tracks.len();
        let mut frames: BTreeMap<i64, Vec<Vec<Note>>> = BTreeMap::new();
        let mut skipped = 0usize;

        for (slot, track) in piece.tracks.iter().enumerate() {
            for note in &track.notes {
                if !step.admits(&note.span) {
                    skipped += 1;
                    continue;
                }
                for point in grid_points(&note.span, step) {
                    frames
                        .entry(point.index)
                        .or_insert_with(|| vec![Vec::new(); track_count])[slot]
                        .push(note.clone());
                }
            }
        }

        debug!(
            tracks = track_count,
            grid_points = frames.len(),
            skipped_short_notes = skipped,
            "built snapshot"
        );

        Self {
            track_indices: piece.tracks.iter().map(|t| t.index).collect(),
            frames,
        }
    }

    /// Track indices in bucket order.
    pub fn track_indices(&self) -> &[usize] {
        &self.track_indices
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last_index(&self) -> Option<i64> {
        self.frames.keys().next_back().copied()
    }

    /// Grid indices with their per-track buckets, in time order.
    pub fn frames(&self) -> impl Iterator<Item = (i64, &[Vec<Note>])> + '_ {
        self.frames.iter().map(|(&i, buckets)| (i, buckets.as_slice()))
    }

    fn slot_of(&self, track_index: usize) -> Option<usize> {
        self.track_indices.iter().position(|&t| t == track_index)
    }

    /// Every quantized occurrence of a track's notes, one per grid index the
    /// note sounds on.
    pub fn occurrences(&self, track_index: usize) -> impl Iterator<Item = &Note> + '_ {
        let slot = self.slot_of(track_index);
        self.frames
            .values()
            .filter_map(move |buckets| slot.map(|s| &buckets[s]))
            .flatten()
    }

    /// All sounding notes at a grid index, tagged with their track.
    pub fn voices_at(&self, grid_index: i64) -> Vec<VoiceNote> {
        let Some(buckets) = self.frames.get(&grid_index) else {
            return Vec::new();
        };
        buckets
            .iter()
            .zip(&self.track_indices)
            .flat_map(|(notes, &track)| {
                notes.iter().map(move |n| VoiceNote {
                    track,
                    pitch: n.pitch,
                })
            })
            .collect()
    }
}
