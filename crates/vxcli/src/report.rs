//! Human-readable check reports.

use owo_colors::OwoColorize;
use std::path::Path;
use voxgrid::{Piece, PieceReport, TrackClassification};

#[derive(Debug, Clone, Copy)]
enum Tone {
    Plain,
    Info,
    Good,
    Warn,
    Alert,
}

pub struct ReportFormatter {
    no_color: bool,
}

impl ReportFormatter {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if self.no_color {
            return text.to_string();
        }
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Info => text.blue().to_string(),
            Tone::Good => text.green().to_string(),
            Tone::Warn => text.bright_red().to_string(),
            Tone::Alert => text.red().bold().to_string(),
        }
    }

    fn line(&self, output: &mut String, text: &str, tone: Tone) {
        output.push_str(&self.paint(text, tone));
        output.push('\n');
    }

    /// Full report for one piece: polyphony, per-track voice likelihoods and
    /// the final decision.
    pub fn format(&self, path: &Path, piece: &Piece, report: &PieceReport) -> String {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut output = String::new();
        let over = |count: usize| if count > report.voices { Tone::Alert } else { Tone::Plain };

        self.line(
            &mut output,
            &format!("{file} has a maximum of {} concurrent notes.", report.polyphony),
            over(report.polyphony),
        );

        for classification in &report.classifications {
            self.format_track(&mut output, &file, piece, classification);
        }

        let recognized = report.kept_tracks.len();
        self.line(
            &mut output,
            &format!("{file} has a maximum of {recognized} recognized voices."),
            if report.too_many_voices() {
                Tone::Alert
            } else {
                Tone::Plain
            },
        );
        if let Some(filtered) = report.filtered_polyphony {
            self.line(
                &mut output,
                &format!(
                    "{file} has a maximum of {filtered} concurrent notes in the filtered tracks."
                ),
                over(filtered),
            );
        }

        if report.accepted {
            self.line(&mut output, &format!("{file} accepted."), Tone::Good);
        } else {
            self.line(
                &mut output,
                &format!(
                    "{file} rejected: needs exactly {} concurrent notes, has {}.",
                    report.voices,
                    report.effective_polyphony()
                ),
                Tone::Warn,
            );
        }
        output
    }

    fn format_track(
        &self,
        output: &mut String,
        file: &str,
        piece: &Piece,
        classification: &TrackClassification,
    ) {
        let label = piece
            .tracks
            .iter()
            .find(|t| t.index == classification.track_index)
            .map(|t| t.label())
            .unwrap_or_else(|| format!("track {}", classification.track_index));
        let span = match classification.pitch_span {
            Some((lo, hi)) => format!("{lo},{hi}"),
            None => "-,-".to_string(),
        };
        let prefix = format!("{file}:{label} with {span}");

        let scores: Vec<String> = classification
            .likelihoods
            .iter()
            .map(|l| format!("{}: {:.2}", l.voice, l.notes))
            .collect();
        self.line(
            output,
            &format!("{prefix} has voice likelihood: {}", scores.join(", ")),
            Tone::Info,
        );

        if classification.is_recognized() {
            let voices: Vec<&str> = classification.recognized.iter().map(|v| v.as_str()).collect();
            self.line(
                output,
                &format!("{prefix} has the following possible voices: {}", voices.join(", ")),
                Tone::Good,
            );
        } else {
            self.line(
                output,
                &format!("{prefix} has none of the requested voices."),
                Tone::Warn,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgrid::{check_piece, CheckParams, GridStep, Note, Track};

    fn piece() -> Piece {
        let line = |index: usize, pitch: u8| {
            let mut track = Track::with_notes(index, vec![Note::new(pitch, 90, 0.0, 1.0).unwrap()]);
            track.name = Some(format!("part{index}"));
            track
        };
        Piece::new(vec![line(0, 72), line(1, 64), line(2, 55), line(3, 43), line(4, 110)])
    }

    #[test]
    fn plain_report_lists_every_track() {
        let piece = piece();
        let report = check_piece(&piece, &CheckParams::new(GridStep::new(0.25).unwrap(), 4));
        let text = ReportFormatter::new(true).format(Path::new("dir/bach.mid"), &piece, &report);

        assert!(text.starts_with("bach.mid has a maximum of 5 concurrent notes.\n"));
        assert!(text.contains("bach.mid:part0(0) with 72,72 has voice likelihood: soprano: 1.00"));
        assert!(text.contains("bach.mid:part3(0) with 43,43 has the following possible voices: bass"));
        assert!(text.contains("bach.mid:part4(0) with 110,110 has none of the requested voices."));
        assert!(text.contains("has a maximum of 4 recognized voices."));
        assert!(text.contains("4 concurrent notes in the filtered tracks."));
        assert!(text.ends_with("bach.mid accepted.\n"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn colored_report_uses_escape_codes() {
        let piece = piece();
        let report = check_piece(&piece, &CheckParams::new(GridStep::new(0.25).unwrap(), 4));
        let text = ReportFormatter::new(false).format(Path::new("bach.mid"), &piece, &report);
        assert!(text.contains('\u{1b}'));
    }
}
