//! Directory-level loading.

use crate::load::load_piece;
use crate::note::Piece;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `.mid` files directly inside `dir`, sorted by path. Not recursive.
pub fn midi_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let io_err = |source| crate::Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_midi = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mid"));
        if is_midi && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "found midi files");
    Ok(files)
}

/// Load every MIDI file in `dir`. Files that fail to load are logged and
/// skipped.
pub fn load_all(dir: &Path) -> crate::Result<Vec<(PathBuf, Piece)>> {
    let mut pieces = Vec::new();
    for path in midi_files(dir)? {
        match load_piece(&path) {
            Ok(piece) => pieces.push((path, piece)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }
    Ok(pieces)
}
