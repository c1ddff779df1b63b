use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Likelihood above which a track counts as singing a voice.
pub const DEFAULT_RECOGNITION_THRESHOLD: f64 = 0.9;

/// Vocal part a track may be singing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRange {
    Soprano,
    Alto,
    Tenor,
    Bass,
}

impl VoiceRange {
    pub const ALL: [VoiceRange; 4] = [Self::Soprano, Self::Alto, Self::Tenor, Self::Bass];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soprano => "soprano",
            Self::Alto => "alto",
            Self::Tenor => "tenor",
            Self::Bass => "bass",
        }
    }
}

impl std::fmt::Display for VoiceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed MIDI pitch interval for one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchBand {
    pub low: u8,
    pub high: u8,
}

impl PitchBand {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, pitch: u8) -> bool {
        self.low <= pitch && pitch <= self.high
    }

    /// `high - low`; a band of one pitch has width 0.
    pub fn width(&self) -> u8 {
        self.high.saturating_sub(self.low)
    }
}

/// Immutable table of voice ranges passed into the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTable {
    entries: Vec<(VoiceRange, PitchBand)>,
}

impl VoiceTable {
    pub fn new(entries: Vec<(VoiceRange, PitchBand)>) -> Self {
        Self { entries }
    }

    /// Standard choral ranges. Alto and tenor overlap in 52..=69.
    pub fn satb() -> Self {
        Self::new(vec![
            (VoiceRange::Soprano, PitchBand::new(60, 81)),
            (VoiceRange::Alto, PitchBand::new(52, 74)),
            (VoiceRange::Tenor, PitchBand::new(46, 69)),
            (VoiceRange::Bass, PitchBand::new(36, 66)),
        ])
    }

    pub fn entries(&self) -> &[(VoiceRange, PitchBand)] {
        &self.entries
    }
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self::satb()
    }
}

/// Both scores of one track against one voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceLikelihood {
    pub voice: VoiceRange,
    /// Share of the voice's range covered by the track's pitch span.
    pub range: f64,
    /// Share of the track's quantized notes that lie inside the voice.
    pub notes: f64,
}

/// Per-track voice scores and the voices it was recognized as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackClassification {
    pub track_index: usize,
    /// Lowest and highest quantized pitch, `None` when the track is silent.
    pub pitch_span: Option<(u8, u8)>,
    pub occurrences: usize,
    pub likelihoods: Vec<VoiceLikelihood>,
    pub recognized: Vec<VoiceRange>,
}

impl TrackClassification {
    pub fn is_recognized(&self) -> bool {
        !self.recognized.is_empty()
    }

    pub fn likelihood(&self, voice: VoiceRange) -> Option<&VoiceLikelihood> {
        self.likelihoods.iter().find(|l| l.voice == voice)
    }
}

/// Integer pitches of `span` inside `band`, divided by the band's width.
///
/// A track spanning the whole band scores slightly above 1 because the count
/// is inclusive while the width is not.
pub fn range_likelihood(span: Option<(u8, u8)>, band: PitchBand) -> f64 {
    let Some((low, high)) = span else {
        return 0.0;
    };
    if band.width() == 0 {
        return 0.0;
    }
    let overlap_low = low.max(band.low);
    let overlap_high = high.min(band.high);
    let count = if overlap_low <= overlap_high {
        (overlap_high - overlap_low) as f64 + 1.0
    } else {
        0.0
    };
    count / band.width() as f64
}

/// Score a single track of the snapshot.
pub fn classify_track(
    snapshot: &Snapshot,
    track_index: usize,
    table: &VoiceTable,
    threshold: f64,
) -> TrackClassification {
    let mut occurrences = 0usize;
    let mut in_band = vec![0usize; table.entries().len()];
    let mut span: Option<(u8, u8)> = None;

    for note in snapshot.occurrences(track_index) {
        occurrences += 1;
        span = Some(match span {
            Some((lo, hi)) => (lo.min(note.pitch), hi.max(note.pitch)),
            None => (note.pitch, note.pitch),
        });
        for (count, (_, band)) in in_band.iter_mut().zip(table.entries()) {
            if band.contains(note.pitch) {
                *count += 1;
            }
        }
    }

    let likelihoods: Vec<VoiceLikelihood> = table
        .entries()
        .iter()
        .zip(&in_band)
        .map(|(&(voice, band), &count)| VoiceLikelihood {
            voice,
            range: range_likelihood(span, band),
            notes: if occurrences > 0 {
                count as f64 / occurrences as f64
            } else {
                0.0
            },
        })
        .collect();

    let recognized = likelihoods
        .iter()
        .filter(|l| l.notes > threshold)
        .map(|l| l.voice)
        .collect();

    TrackClassification {
        track_index,
        pitch_span: span,
        occurrences,
        likelihoods,
        recognized,
    }
}

/// Score every track of the snapshot, in snapshot order.
pub fn classify_tracks(
    snapshot: &Snapshot,
    table: &VoiceTable,
    threshold: f64,
) -> Vec<TrackClassification> {
    snapshot
        .track_indices()
        .iter()
        .map(|&t| classify_track(snapshot, t, table, threshold))
        .collect()
}

/// Indices of tracks recognized as at least one voice.
///
/// Several tracks may claim the same voice; all of them are kept.
pub fn recognized_tracks(classifications: &[TrackClassification]) -> Vec<usize> {
    classifications
        .iter()
        .filter(|c| c.is_recognized())
        .map(|c| c.track_index)
        .collect()
}
