use crate::snapshot::Snapshot;

/// Which tracks of a snapshot to count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackSelection {
    #[default]
    All,
    Only(Vec<usize>),
}

impl TrackSelection {
    fn includes(&self, track_index: usize) -> bool {
        match self {
            Self::All => true,
            Self::Only(indices) => indices.contains(&track_index),
        }
    }
}

/// Largest number of notes sounding together at any grid index.
pub fn max_concurrency(snapshot: &Snapshot, selection: &TrackSelection) -> usize {
    let tracks = snapshot.track_indices();
    snapshot
        .frames()
        .map(|(_, buckets)| {
            buckets
                .iter()
                .zip(tracks)
                .filter(|(_, &t)| selection.includes(t))
                .map(|(notes, _)| notes.len())
                .sum::<usize>()
        })
        .max()
        .unwrap_or(0)
}
