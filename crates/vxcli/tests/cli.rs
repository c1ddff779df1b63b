//! Binary-level tests for the `voxgrid` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use voxgrid::{piece_to_midi, Dataset, ExportOptions, Note, Piece, Track};

fn voxgrid(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("voxgrid").unwrap();
    cmd.current_dir(cwd)
        .env_remove("RUST_LOG")
        .env_remove("VOXGRID_LOG_LEVEL")
        .env_remove("VOXGRID_STEP")
        .env_remove("VOXGRID_VOICES")
        .env_remove("VOXGRID_SEED")
        .env_remove("VOXGRID_MIN_LEN")
        .env_remove("VOXGRID_MAX_LEN")
        .arg("--no-color");
    cmd
}

fn four_voices(beats: usize) -> Piece {
    let voice = |index: usize, base: u8| {
        let notes = (0..beats)
            .map(|b| Note::new(base + (b % 2) as u8, 90, b as f64, b as f64 + 0.9).unwrap())
            .collect();
        Track::with_notes(index, notes)
    };
    Piece::new(vec![voice(0, 72), voice(1, 64), voice(2, 55), voice(3, 43)])
}

fn write_piece(path: &Path, piece: &Piece) {
    std::fs::write(path, piece_to_midi(piece, &ExportOptions::default())).unwrap();
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    voxgrid(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn config_reflects_flags() {
    let dir = tempfile::tempdir().unwrap();
    voxgrid(dir.path())
        .args(["config", "--step", "0.5", "--seed", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("step = 0.5"))
        .stdout(predicate::str::contains("seed = 9"));
}

#[test]
fn local_config_file_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("voxgrid.toml"), "[grid]\nvoices = 3\n").unwrap();
    voxgrid(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("voices = 3"));
}

#[test]
fn check_reports_and_accepts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();
    write_piece(&input.join("chorale.mid"), &four_voices(8));

    voxgrid(dir.path())
        .args(["check", "-i", "in", "-o", "kept"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "chorale.mid has a maximum of 4 concurrent notes.",
        ))
        .stdout(predicate::str::contains("chorale.mid accepted."));
    assert!(dir.path().join("kept/chorale.mid").exists());
}

#[test]
fn convert_writes_a_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bach");
    std::fs::create_dir(&input).unwrap();
    for i in 0..3 {
        write_piece(&input.join(format!("c{i}.mid")), &four_voices(10 + i));
    }

    voxgrid(dir.path())
        .args([
            "convert", "-i", "bach", "-o", "out", "--min-len", "3", "--max-len", "6", "--seed",
            "4",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Done."));

    let dataset = Dataset::load_json(&dir.path().join("out/bach/bach.json")).unwrap();
    assert!(!dataset.is_empty());
}

#[test]
fn inverted_bounds_fail() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("in")).unwrap();
    voxgrid(dir.path())
        .args(["split", "-i", "in", "-o", "out", "--min-len", "50", "--max-len", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid settings"));
}

#[test]
fn flags_repair_an_invalid_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("in")).unwrap();
    std::fs::write(dir.path().join("voxgrid.toml"), "[segment]\nmin_len = 100\n").unwrap();

    voxgrid(dir.path())
        .args(["split", "-i", "in", "-o", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid settings"));

    voxgrid(dir.path())
        .args(["split", "-i", "in", "-o", "out", "--max-len", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 0 excerpts."));
}
