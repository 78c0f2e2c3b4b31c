//! Clip trimming: open each acquired track and bound it to a maximum duration.

use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::acquire::acquirer::panic_message;
use crate::audio::{AudioDecoder, AudioStream};
use crate::error::{MashupError, Result};
use crate::types::{ClipSummary, ItemFailure, TrackFile, TRACK_EXTENSION};

/// Frames read from the decoder per call.
const READ_CHUNK_FRAMES: usize = 4096;

/// An open track bounded to `[0, effective_end]`.
///
/// Owns the decoder stream; dropping the clip releases it.
pub struct BoundedClip {
    track: TrackFile,
    stream: Box<dyn AudioStream>,
    requested_secs: f64,
    effective_end_secs: f64,
}

impl BoundedClip {
    /// Wraps an open stream. The effective end is
    /// `min(requested, source duration)`, never negative.
    pub fn new(track: TrackFile, stream: Box<dyn AudioStream>, requested_secs: f64) -> Self {
        let source = stream.duration_secs();
        let effective_end_secs = requested_secs.max(0.0).min(source);
        Self {
            track,
            stream,
            requested_secs,
            effective_end_secs,
        }
    }

    pub fn track(&self) -> &TrackFile {
        &self.track
    }

    pub fn source_duration_secs(&self) -> f64 {
        self.stream.duration_secs()
    }

    pub fn requested_secs(&self) -> f64 {
        self.requested_secs
    }

    pub fn effective_end_secs(&self) -> f64 {
        self.effective_end_secs
    }

    /// Clips always start at 0, so this equals the effective end.
    pub fn effective_duration_secs(&self) -> f64 {
        self.effective_end_secs
    }

    pub fn sample_rate(&self) -> u32 {
        self.stream.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.stream.channels()
    }

    /// Last frame (exclusive) of the clip at the source rate.
    pub fn end_frame(&self) -> u64 {
        let frames = (self.effective_end_secs * self.stream.sample_rate() as f64).round() as u64;
        frames.min(self.stream.total_frames())
    }

    /// Reads the clip's samples, interleaved, from frame 0 to the end frame.
    pub fn read_bounded(&mut self) -> Result<Vec<f32>> {
        let channels = self.stream.channels() as usize;
        let mut remaining = self.end_frame() as usize;
        let mut samples = Vec::with_capacity(remaining * channels);
        while remaining > 0 {
            let chunk = self.stream.read_frames(remaining.min(READ_CHUNK_FRAMES))?;
            if chunk.is_empty() {
                break;
            }
            remaining = remaining.saturating_sub(chunk.len() / channels.max(1));
            samples.extend_from_slice(&chunk);
        }
        Ok(samples)
    }

    pub fn summary(&self) -> ClipSummary {
        ClipSummary {
            sequence: self.track.sequence,
            label: self.track.label(),
            source_duration_secs: self.source_duration_secs(),
            effective_duration_secs: self.effective_duration_secs(),
        }
    }
}

impl fmt::Debug for BoundedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedClip")
            .field("track", &self.track)
            .field("requested_secs", &self.requested_secs)
            .field("effective_end_secs", &self.effective_end_secs)
            .finish()
    }
}

/// Clips ready for composition plus the tracks that could not be opened.
#[derive(Debug, Default)]
pub struct Trimmed {
    /// Clips in sequence order.
    pub clips: Vec<BoundedClip>,
    pub failures: Vec<ItemFailure>,
}

/// Opens tracks through an [`AudioDecoder`] and bounds them.
pub struct Trimmer<'a> {
    decoder: &'a dyn AudioDecoder,
}

impl<'a> Trimmer<'a> {
    pub fn new(decoder: &'a dyn AudioDecoder) -> Self {
        Self { decoder }
    }

    /// Opens every track in sequence order and bounds it to
    /// `max_duration_secs`. Tracks without the mp3 extension or that fail to
    /// open are recorded and skipped.
    pub fn trim(&self, tracks: &[TrackFile], max_duration_secs: f64) -> Trimmed {
        let mut ordered: Vec<&TrackFile> = tracks.iter().collect();
        ordered.sort_by_key(|t| t.sequence);

        let mut trimmed = Trimmed::default();
        for track in ordered {
            if !track.has_track_extension() {
                debug!(path = %track.path.display(), "not an audio track, skipping");
                trimmed.failures.push(ItemFailure::trim(
                    track.label(),
                    format!("not a .{} file", TRACK_EXTENSION),
                ));
                continue;
            }

            match self.open(track) {
                Ok(stream) => {
                    let clip = BoundedClip::new(track.clone(), stream, max_duration_secs);
                    debug!(
                        track = %track.label(),
                        source = clip.source_duration_secs(),
                        end = clip.effective_end_secs(),
                        "clip bounded"
                    );
                    trimmed.clips.push(clip);
                }
                Err(reason) => {
                    warn!(track = %track.label(), reason = %reason, "failed to open, skipping");
                    trimmed.failures.push(ItemFailure::trim(track.label(), reason));
                }
            }
        }
        trimmed
    }

    /// Trims every file in `dir`, ordered by file name.
    pub fn trim_dir(&self, dir: &Path, max_duration_secs: f64) -> Result<Trimmed> {
        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(|e| {
                MashupError::internal(format!("Failed to list {}: {}", dir.display(), e))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let tracks: Vec<TrackFile> = paths
            .into_iter()
            .enumerate()
            .map(|(sequence, path)| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                TrackFile::new(sequence, path, name.clone(), name)
            })
            .collect();

        Ok(self.trim(&tracks, max_duration_secs))
    }

    fn open(&self, track: &TrackFile) -> std::result::Result<Box<dyn AudioStream>, String> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.decoder.open(&track.path))) {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(e.message),
            Err(payload) => Err(format!("decoder panicked: {}", panic_message(&*payload))),
        }
    }
}
