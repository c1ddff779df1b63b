use crate::classify::{
    classify_tracks, recognized_tracks, TrackClassification, VoiceTable,
    DEFAULT_RECOGNITION_THRESHOLD,
};
use crate::grid::GridStep;
use crate::note::Piece;
use crate::polyphony::{max_concurrency, TrackSelection};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for deciding whether a piece is usable as SATB material.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckParams {
    pub step: GridStep,
    pub voices: usize,
    pub threshold: f64,
    pub table: VoiceTable,
}

impl CheckParams {
    pub fn new(step: GridStep, voices: usize) -> Self {
        Self {
            step,
            voices,
            threshold: DEFAULT_RECOGNITION_THRESHOLD,
            table: VoiceTable::satb(),
        }
    }
}

/// Everything measured while checking one piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceReport {
    /// Peak polyphony over all tracks.
    pub polyphony: usize,
    pub classifications: Vec<TrackClassification>,
    /// Tracks recognized as at least one voice.
    pub kept_tracks: Vec<usize>,
    /// Peak polyphony over the kept tracks, `None` when no track was kept.
    pub filtered_polyphony: Option<usize>,
    pub voices: usize,
    pub accepted: bool,
}

impl PieceReport {
    /// Polyphony the decision was made on.
    pub fn effective_polyphony(&self) -> usize {
        self.filtered_polyphony.unwrap_or(self.polyphony)
    }

    pub fn too_many_voices(&self) -> bool {
        self.kept_tracks.len() > self.voices
    }
}

/// Measure polyphony, classify every track and decide acceptance.
///
/// A piece is accepted when the recognized tracks (or all tracks, if none
/// were recognized) peak at exactly `voices` simultaneous notes.
pub fn check_piece(piece: &Piece, params: &CheckParams) -> PieceReport {
    let snapshot = Snapshot::build(piece, params.step);
    let polyphony = max_concurrency(&snapshot, &TrackSelection::All);
    let classifications = classify_tracks(&snapshot, &params.table, params.threshold);
    let kept_tracks = recognized_tracks(&classifications);

    let filtered_polyphony = (!kept_tracks.is_empty())
        .then(|| max_concurrency(&snapshot, &TrackSelection::Only(kept_tracks.clone())));

    let accepted = filtered_polyphony.unwrap_or(polyphony) == params.voices;
    debug!(
        polyphony,
        kept = kept_tracks.len(),
        ?filtered_polyphony,
        accepted,
        "checked piece"
    );

    PieceReport {
        polyphony,
        classifications,
        kept_tracks,
        filtered_polyphony,
        voices: params.voices,
        accepted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::VoiceRange;
    use crate::note::{Note, Track};

    fn line(index: usize, pitches: &[u8]) -> Track {
        let notes = pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| Note::new(p, 90, i as f64, i as f64 + 0.9).unwrap())
            .collect();
        Track::with_notes(index, notes)
    }

    fn params() -> CheckParams {
        CheckParams::new(GridStep::new(0.25).unwrap(), 4)
    }

    fn chorale() -> Vec<Track> {
        vec![
            line(0, &[72, 74, 76, 77]),
            line(1, &[64, 65, 67, 69]),
            line(2, &[55, 57, 59, 60]),
            line(3, &[40, 41, 43, 45]),
        ]
    }

    #[test]
    fn four_part_chorale_is_accepted() {
        let report = check_piece(&Piece::new(chorale()), &params());
        assert_eq!(report.polyphony, 4);
        assert_eq!(report.kept_tracks, vec![0, 1, 2, 3]);
        assert_eq!(report.filtered_polyphony, Some(4));
        assert!(report.accepted);
        assert!(report.classifications[0].recognized.contains(&VoiceRange::Soprano));
        assert!(report.classifications[3].recognized.contains(&VoiceRange::Bass));
    }

    #[test]
    fn out_of_range_accompaniment_is_filtered_out() {
        let mut tracks = chorale();
        tracks.push(line(4, &[96, 98, 100, 101]));
        let report = check_piece(&Piece::new(tracks), &params());
        assert_eq!(report.polyphony, 5);
        assert_eq!(report.kept_tracks, vec![0, 1, 2, 3]);
        assert_eq!(report.effective_polyphony(), 4);
        assert!(report.accepted);
    }

    #[test]
    fn thin_texture_is_rejected() {
        let report = check_piece(&Piece::new(chorale()[..2].to_vec()), &params());
        assert_eq!(report.effective_polyphony(), 2);
        assert!(!report.accepted);
    }

    #[test]
    fn nothing_recognized_falls_back_to_global_polyphony() {
        let tracks = vec![
            line(0, &[100, 101]),
            line(1, &[102, 103]),
            line(2, &[104, 105]),
            line(3, &[106, 107]),
        ];
        let report = check_piece(&Piece::new(tracks), &params());
        assert!(report.kept_tracks.is_empty());
        assert_eq!(report.filtered_polyphony, None);
        assert!(report.accepted);
    }

    #[test]
    fn empty_piece_is_rejected() {
        let report = check_piece(&Piece::default(), &params());
        assert_eq!(report.polyphony, 0);
        assert!(!report.accepted);
    }
}
