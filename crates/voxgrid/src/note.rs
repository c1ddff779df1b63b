use crate::timespan::Timespan;
use serde::{Deserialize, Serialize};

/// A single note with absolute timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub span: Timespan,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, start: f64, end: f64) -> crate::Result<Self> {
        Ok(Self {
            pitch,
            velocity,
            span: Timespan::new(start, end)?,
        })
    }

    pub fn start(&self) -> f64 {
        self.span.start
    }

    pub fn end(&self) -> f64 {
        self.span.end
    }

    pub fn duration(&self) -> f64 {
        self.span.duration()
    }

    /// Copy of this note with a different span.
    pub fn with_span(&self, span: Timespan) -> Self {
        Self {
            pitch: self.pitch,
            velocity: self.velocity,
            span,
        }
    }
}

/// One instrument part. The index is the track's position in its piece and
/// survives filtering and segmentation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    pub index: usize,
    pub name: Option<String>,
    pub program: u8,
    pub is_drum: bool,
    pub notes: Vec<Note>,
}

impl Track {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn with_notes(index: usize, notes: Vec<Note>) -> Self {
        Self {
            index,
            notes,
            ..Default::default()
        }
    }

    /// Same identity (index, name, program), no notes.
    pub fn empty_like(&self) -> Self {
        Self {
            index: self.index,
            name: self.name.clone(),
            program: self.program,
            is_drum: self.is_drum,
            notes: Vec::new(),
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => format!("{}({})", name.trim(), self.program),
            _ => format!("track {}({})", self.index, self.program),
        }
    }

    pub fn end_time(&self) -> f64 {
        self.notes.iter().map(|n| n.end()).fold(0.0, f64::max)
    }
}

/// An ordered set of tracks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Piece {
    pub tracks: Vec<Track>,
}

impl Piece {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Latest note end over all tracks, 0 for a piece without notes.
    pub fn duration(&self) -> f64 {
        self.tracks.iter().map(Track::end_time).fold(0.0, f64::max)
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Keep only the tracks whose index is listed, in piece order.
    pub fn select(&self, indices: &[usize]) -> Piece {
        Piece {
            tracks: self
                .tracks
                .iter()
                .filter(|t| indices.contains(&t.index))
                .cloned()
                .collect(),
        }
    }
}
