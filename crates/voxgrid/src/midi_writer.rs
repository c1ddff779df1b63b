use crate::note::{Piece, Track};
use serde::{Deserialize, Serialize};

const DRUM_CHANNEL: u8 = 9;

/// Options for MIDI export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Ticks per quarter note. Default: 480.
    pub ppq: u16,
    /// Constant tempo written to the tempo track. Default: 120.
    pub bpm: f64,
    /// Emit a track-name event for named tracks. Default: true.
    pub track_names: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ppq: 480,
            bpm: 120.0,
            track_names: true,
        }
    }
}

impl ExportOptions {
    fn micros_per_beat(&self) -> u32 {
        let bpm = if self.bpm.is_finite() && self.bpm > 0.0 {
            self.bpm
        } else {
            120.0
        };
        (60_000_000.0 / bpm).round().clamp(1.0, 16_777_215.0) as u32
    }

    fn ticks(&self, seconds: f64) -> u64 {
        let beats = seconds * 1_000_000.0 / f64::from(self.micros_per_beat());
        (beats * f64::from(self.ppq)).round().max(0.0) as u64
    }
}

/// Write a piece to Standard MIDI File format 1 bytes.
///
/// Track 0: constant tempo.
/// Tracks 1+: one per piece track, with name, program change and notes.
pub fn piece_to_midi(piece: &Piece, options: &ExportOptions) -> Vec<u8> {
    let mut tracks: Vec<Vec<u8>> = vec![build_tempo_track(options)];

    let mut next_channel = 0u8;
    for track in &piece.tracks {
        let channel = if track.is_drum {
            DRUM_CHANNEL
        } else {
            let ch = next_channel;
            next_channel = (next_channel + 1) % 16;
            if next_channel == DRUM_CHANNEL {
                next_channel += 1;
            }
            ch
        };
        tracks.push(build_part_track(track, channel, options));
    }

    build_midi_file(options.ppq, &tracks)
}

fn build_tempo_track(options: &ExportOptions) -> Vec<u8> {
    let usec = options.micros_per_beat();
    let mut track_data = Vec::new();
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[
        0xFF,
        0x51,
        0x03,
        (usec >> 16) as u8,
        (usec >> 8) as u8,
        usec as u8,
    ]);
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    track_data
}

fn build_part_track(track: &Track, channel: u8, options: &ExportOptions) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    if options.track_names {
        if let Some(name) = track.name.as_deref().filter(|n| !n.is_empty()) {
            let mut name_event = vec![0xFF, 0x03];
            write_vlq(&mut name_event, name.len() as u32);
            name_event.extend_from_slice(name.as_bytes());
            events.push((0, name_event));
        }
    }

    let status = channel & 0x0F;
    events.push((0, vec![0xC0 | status, track.program & 0x7F]));

    for note in &track.notes {
        let pitch = note.pitch & 0x7F;
        // Velocity zero would read back as a note-off.
        let velocity = (note.velocity & 0x7F).max(1);
        let (on, off) = (options.ticks(note.start()), options.ticks(note.end()));
        if off <= on {
            continue;
        }
        events.push((on, vec![0x90 | status, pitch, velocity]));
        events.push((off, vec![0x80 | status, pitch, 0]));
    }

    // Note-offs before note-ons at the same tick; meta events stay first.
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    let mut track_data = Vec::new();
    let mut last_tick = 0u64;
    for (tick, data) in events {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta.min(0x0FFF_FFFF) as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    track_data
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.max(1).to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        buf.push(0);
        return;
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::piece_from_smf_bytes;
    use crate::note::Note;
    use midly::Smf;
    use pretty_assertions::assert_eq;

    fn note(pitch: u8, start: f64, end: f64) -> Note {
        Note::new(pitch, 100, start, end).unwrap()
    }

    fn soprano_and_bass() -> Piece {
        let mut soprano = Track::with_notes(0, vec![note(72, 0.0, 0.5), note(74, 0.5, 1.0)]);
        soprano.name = Some("Soprano".to_string());
        soprano.program = 52;
        let bass = Track::with_notes(1, vec![note(48, 0.0, 1.0)]);
        Piece::new(vec![soprano, bass])
    }

    #[test]
    fn writes_format_one_with_tempo_track() {
        let bytes = piece_to_midi(&soprano_and_bass(), &ExportOptions::default());
        let smf = Smf::parse(&bytes).expect("generated MIDI should parse");
        assert_eq!(smf.header.format, midly::Format::Parallel);
        assert_eq!(smf.tracks.len(), 3);
    }

    #[test]
    fn round_trip_preserves_notes_and_identity() {
        let original = soprano_and_bass();
        let bytes = piece_to_midi(&original, &ExportOptions::default());
        let loaded = piece_from_smf_bytes(&bytes).unwrap();

        assert_eq!(loaded.tracks.len(), 2);
        assert_eq!(loaded.tracks[0].name.as_deref(), Some("Soprano"));
        assert_eq!(loaded.tracks[0].program, 52);
        for (a, b) in original.tracks.iter().zip(&loaded.tracks) {
            let want: Vec<(u8, f64, f64)> =
                a.notes.iter().map(|n| (n.pitch, n.start(), n.end())).collect();
            let got: Vec<(u8, f64, f64)> =
                b.notes.iter().map(|n| (n.pitch, n.start(), n.end())).collect();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn repeated_pitch_is_not_cut_short() {
        let piece = Piece::new(vec![Track::with_notes(
            0,
            vec![note(60, 0.0, 0.5), note(60, 0.5, 1.0)],
        )]);
        let loaded = piece_from_smf_bytes(&piece_to_midi(&piece, &ExportOptions::default())).unwrap();
        let spans: Vec<(f64, f64)> = loaded.tracks[0]
            .notes
            .iter()
            .map(|n| (n.start(), n.end()))
            .collect();
        assert_eq!(spans, vec![(0.0, 0.5), (0.5, 1.0)]);
    }

    #[test]
    fn drums_go_to_channel_ten() {
        let mut kit = Track::with_notes(0, vec![note(36, 0.0, 0.25)]);
        kit.is_drum = true;
        let loaded =
            piece_from_smf_bytes(&piece_to_midi(&Piece::new(vec![kit]), &ExportOptions::default()))
                .unwrap();
        assert!(loaded.tracks[0].is_drum);
    }

    #[test]
    fn vlq_encoding() {
        let mut buf = Vec::new();
        write_vlq(&mut buf, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        write_vlq(&mut buf, 127);
        assert_eq!(buf, vec![0x7F]);

        buf.clear();
        write_vlq(&mut buf, 128);
        assert_eq!(buf, vec![0x81, 0x00]);

        buf.clear();
        write_vlq(&mut buf, 480);
        assert_eq!(buf, vec![0x83, 0x60]);
    }
}
