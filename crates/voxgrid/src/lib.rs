pub mod batch;
pub mod check;
pub mod classify;
pub mod dataset;
pub mod encode;
pub mod grid;
pub mod load;
pub mod midi_writer;
pub mod note;
pub mod polyphony;
pub mod reduce;
pub mod segment;
pub mod snapshot;
pub mod timespan;

pub use batch::{load_all, midi_files};
pub use check::{check_piece, CheckParams, PieceReport};
pub use classify::{
    classify_track, classify_tracks, range_likelihood, recognized_tracks, PitchBand,
    TrackClassification, VoiceLikelihood, VoiceRange, VoiceTable, DEFAULT_RECOGNITION_THRESHOLD,
};
pub use dataset::{split_sets, Dataset, PitchGrid, SetSplit};
pub use encode::{decode_frames, encode_piece, encode_snapshot, pitch_grid, EncodeStats, Frame};
pub use grid::{grid_points, smallest_multiple_ge, GridPoint, GridPoints, GridStep};
pub use load::{load_piece, piece_from_smf_bytes};
pub use midi_writer::{piece_to_midi, ExportOptions};
pub use note::{Note, Piece, Track};
pub use polyphony::{max_concurrency, TrackSelection};
pub use reduce::{find_triad, reduce_chord, ChordPosition, DegenerateChord, Slot, Triad, VoiceNote};
pub use segment::{excerpt, segment, windows, SegmentBounds};
pub use snapshot::Snapshot;
pub use timespan::Timespan;

use std::path::PathBuf;

/// Errors from loading, quantizing and packaging pieces.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unreadable source {path}: {message}")]
    UnreadableSource { path: PathBuf, message: String },

    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("grid step must be finite and positive, got {0}")]
    InvalidStep(f64),

    #[error("malformed timespan: start {start} > end {end}")]
    MalformedTimespan { start: f64, end: f64 },

    #[error("invalid segment bounds: {0}")]
    InvalidSegmentBounds(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
