//! CLI command implementations

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use voxgrid::{
    check_piece, decode_frames, encode_piece, load_all, midi_files, piece_to_midi, pitch_grid,
    segment, split_sets, Dataset, ExportOptions, Piece, PitchGrid, SetSplit,
};

use crate::report::ReportFormatter;
use crate::settings::Settings;

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn copy_into(path: &Path, dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let dest = dir.join(name);
    fs::copy(path, &dest)
        .with_context(|| format!("Failed to copy {} to {}", path.display(), dest.display()))?;
    Ok(dest)
}

fn write_midi(path: &Path, piece: &Piece) -> Result<()> {
    let bytes = piece_to_midi(piece, &ExportOptions::default());
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Report on every MIDI file in `input` and copy the accepted ones into
/// `output`. Returns the accepted paths in `output` (or `input` when no
/// output was given).
pub fn check(input: &Path, output: Option<&Path>, settings: &Settings) -> Result<Vec<PathBuf>> {
    println!(
        "Checking files from {} for {} voices in {}s steps...",
        input.display(),
        settings.voices,
        settings.step.seconds()
    );
    if let Some(dir) = output {
        ensure_dir(dir)?;
    }

    let formatter = ReportFormatter::new(settings.no_color);
    let mut accepted = Vec::new();
    for (path, piece) in load_all(input)? {
        println!("\nAnalysing {}...", path.display());
        let report = check_piece(&piece, &settings.check);
        print!("{}", formatter.format(&path, &piece, &report));

        if report.accepted {
            match output {
                Some(dir) => {
                    let dest = copy_into(&path, dir)?;
                    println!("Saving {}...", dest.display());
                    accepted.push(dest);
                }
                None => accepted.push(path),
            }
        }
    }

    println!("{} files accepted.", accepted.len());
    Ok(accepted)
}

/// Cut every MIDI file in `input` into excerpts named `<name>_<i>.mid`.
pub fn split(input: &Path, output: &Path, settings: &Settings) -> Result<usize> {
    println!(
        "Splitting files from {} to {} with min: {}, max: {}...",
        input.display(),
        output.display(),
        settings.bounds.min_len,
        settings.bounds.max_len
    );
    ensure_dir(output)?;

    let mut written = 0;
    for (path, piece) in load_all(input)? {
        println!("Processing {}...", path.display());
        let stem = file_stem(&path)?;
        let parts = segment(&piece, &settings.bounds)
            .with_context(|| format!("Failed to segment {}", path.display()))?;
        for (i, part) in parts.iter().enumerate() {
            let dest = output.join(format!("{stem}_{i}.mid"));
            write_midi(&dest, part)?;
            written += 1;
        }
        debug!(path = %path.display(), parts = parts.len(), "split");
    }

    println!("Wrote {written} excerpts.");
    Ok(written)
}

/// Shuffle the MIDI files in `input` into `train/`, `test/` and `valid/`
/// below `output`.
pub fn sets(input: &Path, output: &Path, settings: &Settings) -> Result<SetSplit<PathBuf>> {
    println!("Separating files from {} into {}...", input.display(), output.display());
    let files = midi_files(input)?;
    let split = split_sets(files, &mut settings.rng());

    let mut copied = SetSplit::default();
    for (name, files) in split.named() {
        let dir = output.join(name);
        ensure_dir(&dir)?;
        println!("Copying {} files to {}", files.len(), dir.display());
        let dests = files
            .iter()
            .map(|file| copy_into(file, &dir))
            .collect::<Result<Vec<_>>>()?;
        match name {
            "train" => copied.train = dests,
            "test" => copied.test = dests,
            _ => copied.valid = dests,
        }
    }
    Ok(copied)
}

/// Rewrite every MIDI file in `input` as its chord-reduced voice frames,
/// named `<name>_reduced.mid`.
pub fn reduce(input: &Path, output: &Path, settings: &Settings) -> Result<usize> {
    println!(
        "Processing files from {} to {} with {} notes in {} steps...",
        input.display(),
        output.display(),
        settings.voices,
        settings.step.seconds()
    );
    ensure_dir(output)?;

    let mut written = 0;
    for (path, piece) in load_all(input)? {
        println!("Processing {}...", path.display());
        let (frames, stats) = encode_piece(&piece, settings.step, settings.voices);
        if stats.degenerate > 0 {
            warn!(
                path = %path.display(),
                degenerate = stats.degenerate,
                "frames without a recognizable triad were left silent"
            );
        }
        let reduced = decode_frames(&frames, settings.step);
        let dest = output.join(format!("{}_reduced.mid", file_stem(&path)?));
        println!("Saving {}...", dest.display());
        write_midi(&dest, &reduced)?;
        written += 1;
    }
    Ok(written)
}

fn encode_dir(dir: &Path, settings: &Settings) -> Result<Vec<PitchGrid>> {
    let pieces = load_all(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    Ok(pieces
        .iter()
        .map(|(_, piece)| {
            let (frames, _) = encode_piece(piece, settings.step, settings.voices);
            pitch_grid(&frames)
        })
        .collect())
}

/// Encode the three set directories into one dataset file.
pub fn build(
    train: &Path,
    test: &Path,
    valid: &Path,
    output: &Path,
    settings: &Settings,
) -> Result<Dataset> {
    println!(
        "Transforming files with steps={} and note_count={}...",
        settings.step.seconds(),
        settings.voices
    );
    let dataset = Dataset {
        train: encode_dir(train, settings)?,
        test: encode_dir(test, settings)?,
        valid: encode_dir(valid, settings)?,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    println!("Saving data to {}...", output.display());
    dataset
        .save_json(output)
        .with_context(|| format!("Failed to save dataset to {}", output.display()))?;
    println!(
        "{} train, {} test, {} valid pieces.",
        dataset.train.len(),
        dataset.test.len(),
        dataset.valid.len()
    );
    Ok(dataset)
}

/// Filter, split, shuffle and build in one go.
///
/// Every stage writes below `output/<input name>/`; the dataset ends up in
/// `output/<input name>/<input name>.json`.
pub fn convert(input: &Path, output: &Path, settings: &Settings) -> Result<PathBuf> {
    let name = input
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", input.display()))?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "voxgrid".to_string());
    let root = output.join(&name);
    println!(
        "Converting {} with {} notes, {}s steps and piece lengths of {} to {} into {}...",
        input.display(),
        settings.voices,
        settings.step.seconds(),
        settings.bounds.min_len,
        settings.bounds.max_len,
        root.display()
    );

    let filtered = root.join("filtered");
    check(input, Some(&filtered), settings)?;

    let splitted = root.join("splitted");
    split(&filtered, &splitted, settings)?;

    let set_dir = root.join("sets");
    sets(&splitted, &set_dir, settings)?;

    let dataset_path = root.join(format!("{name}.json"));
    build(
        &set_dir.join("train"),
        &set_dir.join("test"),
        &set_dir.join("valid"),
        &dataset_path,
        settings,
    )?;
    println!("Done.");
    Ok(dataset_path)
}
