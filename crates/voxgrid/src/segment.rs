use crate::note::{Piece, Track};
use crate::timespan::Timespan;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Remaining length, in part lengths, below which no further window is cut.
const WINDOW_TOLERANCE: f64 = 1e-9;

/// Length limits for excerpts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentBounds {
    pub min_len: f64,
    pub max_len: f64,
    /// Preferred number of excerpts per piece.
    pub part_count: usize,
}

impl Default for SegmentBounds {
    fn default() -> Self {
        Self {
            min_len: 15.0,
            max_len: 90.0,
            part_count: 5,
        }
    }
}

impl SegmentBounds {
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.min_len.is_finite() && self.max_len.is_finite()) {
            return Err(crate::Error::InvalidSegmentBounds(
                "lengths must be finite".to_string(),
            ));
        }
        if self.min_len <= 0.0 {
            return Err(crate::Error::InvalidSegmentBounds(format!(
                "min_len must be positive, got {}",
                self.min_len
            )));
        }
        if self.min_len > self.max_len {
            return Err(crate::Error::InvalidSegmentBounds(format!(
                "min_len {} exceeds max_len {}",
                self.min_len, self.max_len
            )));
        }
        if self.part_count == 0 {
            return Err(crate::Error::InvalidSegmentBounds(
                "part_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `total / part_count` clamped into `[min_len, max_len]`.
    pub fn part_length(&self, total: f64) -> f64 {
        (total / self.part_count as f64).clamp(self.min_len, self.max_len)
    }
}

/// The excerpt of `piece` inside `window`, moved to start at zero.
///
/// Every track is kept, even when no note falls inside the window.
pub fn excerpt(piece: &Piece, window: Timespan) -> Piece {
    let tracks = piece
        .tracks
        .iter()
        .map(|track| {
            let notes = track
                .notes
                .iter()
                .filter_map(|note| {
                    window
                        .intersect(&note.span)
                        .map(|span| note.with_span(span.shift(window.start)))
                })
                .collect();
            Track {
                notes,
                ..track.empty_like()
            }
        })
        .collect();
    Piece::new(tracks)
}

/// Consecutive windows of equal length covering `[0, total]`; the last one
/// ends exactly at `total`.
pub fn windows(total: f64, bounds: &SegmentBounds) -> crate::Result<Vec<Timespan>> {
    bounds.validate()?;
    if !total.is_finite() {
        return Err(crate::Error::InvalidSegmentBounds(format!(
            "piece length must be finite, got {total}"
        )));
    }
    let part = bounds.part_length(total);
    let mut result = Vec::new();
    let mut index = 0usize;
    loop {
        let start = index as f64 * part;
        if total - start <= part * WINDOW_TOLERANCE {
            break;
        }
        let next = (index + 1) as f64 * part;
        let end = if total - next <= part * WINDOW_TOLERANCE {
            total
        } else {
            next
        };
        result.push(Timespan::new(start, end)?);
        index += 1;
    }
    Ok(result)
}

/// Split a piece into excerpts of bounded length.
pub fn segment(piece: &Piece, bounds: &SegmentBounds) -> crate::Result<Vec<Piece>> {
    let total = piece.duration();
    let windows = windows(total, bounds)?;
    debug!(
        total,
        parts = windows.len(),
        part_length = bounds.part_length(total),
        "segmenting piece"
    );
    Ok(windows.into_iter().map(|w| excerpt(piece, w)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    fn note(pitch: u8, start: f64, end: f64) -> Note {
        Note::new(pitch, 90, start, end).unwrap()
    }

    fn bounds(min_len: f64, max_len: f64, part_count: usize) -> SegmentBounds {
        SegmentBounds {
            min_len,
            max_len,
            part_count,
        }
    }

    #[test]
    fn hundred_seconds_in_five_parts() {
        let piece = Piece::new(vec![Track::with_notes(0, vec![note(60, 0.0, 100.0)])]);
        let parts = segment(&piece, &bounds(15.0, 90.0, 5)).unwrap();
        assert_eq!(parts.len(), 5);
        for part in &parts {
            let n = &part.tracks[0].notes[0];
            assert_eq!(n.span, Timespan::new(0.0, 20.0).unwrap());
        }
    }

    #[test]
    fn part_length_is_clamped() {
        let b = bounds(15.0, 90.0, 5);
        assert_eq!(b.part_length(100.0), 20.0);
        assert_eq!(b.part_length(30.0), 15.0);
        assert_eq!(b.part_length(1000.0), 90.0);
    }

    #[test]
    fn last_window_is_truncated() {
        let w = windows(40.0, &bounds(15.0, 90.0, 5)).unwrap();
        let spans: Vec<(f64, f64)> = w.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0.0, 15.0), (15.0, 30.0), (30.0, 40.0)]);
    }

    #[test]
    fn float_drift_does_not_add_a_sliver_window() {
        // 449.96 / 5 * 5 lands just below 449.96
        let piece = Piece::new(vec![Track::with_notes(0, vec![note(60, 0.0, 449.96)])]);
        let parts = segment(&piece, &SegmentBounds::default()).unwrap();
        assert_eq!(parts.len(), 5);
        for part in &parts {
            assert!(part.tracks[0].notes[0].duration() > 1.0);
        }

        let w = windows(449.96, &SegmentBounds::default()).unwrap();
        assert_eq!(w.last().map(|s| s.end), Some(449.96));
        assert!(windows(f64::INFINITY, &SegmentBounds::default()).is_err());
    }

    #[test]
    fn empty_piece_has_no_windows() {
        assert!(segment(&Piece::default(), &SegmentBounds::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let piece = Piece::new(vec![Track::with_notes(0, vec![note(60, 0.0, 10.0)])]);
        assert!(matches!(
            segment(&piece, &bounds(90.0, 15.0, 5)),
            Err(crate::Error::InvalidSegmentBounds(_))
        ));
        assert!(segment(&piece, &bounds(15.0, 90.0, 0)).is_err());
        assert!(segment(&piece, &bounds(0.0, 90.0, 5)).is_err());
    }

    #[test]
    fn notes_crossing_a_boundary_are_split() {
        let piece = Piece::new(vec![
            Track::with_notes(0, vec![note(60, 10.0, 25.0), note(62, 31.0, 32.0)]),
            Track::with_notes(1, vec![note(48, 0.0, 5.0)]),
        ]);
        let parts = segment(&piece, &bounds(15.0, 90.0, 5)).unwrap();
        assert_eq!(parts.len(), 3);

        assert_eq!(parts[0].tracks[0].notes[0].span, Timespan::new(10.0, 15.0).unwrap());
        assert_eq!(parts[1].tracks[0].notes[0].span, Timespan::new(0.0, 10.0).unwrap());
        assert_eq!(parts[2].tracks[0].notes[0].span, Timespan::new(1.0, 2.0).unwrap());
    }

    #[test]
    fn empty_tracks_are_kept_per_segment() {
        let piece = Piece::new(vec![
            Track::with_notes(0, vec![note(60, 0.0, 40.0)]),
            Track::with_notes(5, vec![note(48, 0.0, 5.0)]),
        ]);
        let parts = segment(&piece, &bounds(15.0, 90.0, 5)).unwrap();
        for part in &parts {
            assert_eq!(part.tracks.len(), 2);
            assert_eq!(part.tracks[1].index, 5);
        }
        assert!(parts[2].tracks[1].notes.is_empty());
    }

    #[test]
    fn shifted_starts_are_never_negative() {
        let piece = Piece::new(vec![Track::with_notes(
            0,
            (0..40)
                .map(|i| note(60 + (i % 12) as u8, i as f64 * 2.5, i as f64 * 2.5 + 3.7))
                .collect(),
        )]);
        for part in segment(&piece, &bounds(15.0, 90.0, 5)).unwrap() {
            for n in &part.tracks[0].notes {
                assert!(n.start() >= 0.0);
                assert!(n.end() >= n.start());
            }
        }
    }
}
