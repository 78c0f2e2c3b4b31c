//! Mashup composition: concatenate bounded clips into one WAV file.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::trim::BoundedClip;
use crate::audio::{conform, frames_to_duration, TargetFormat, WavSink};
use crate::error::MashupError;
use crate::types::ClipSummary;

/// Errors raised by [`Composer::compose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// No clips were supplied. No output file is created.
    NoInput,
    /// The output could not be written. All clips have been released and the
    /// partial output removed.
    WriteFailed(String),
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::NoInput => write!(f, "No clips to compose"),
            ComposeError::WriteFailed(reason) => write!(f, "Failed to write mashup: {}", reason),
        }
    }
}

impl std::error::Error for ComposeError {}

impl From<ComposeError> for MashupError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::NoInput => MashupError::new(
                crate::error::ErrorCode::NoTracksAvailable,
                "No clips to compose",
            ),
            ComposeError::WriteFailed(reason) => MashupError::write_failed(reason),
        }
    }
}

/// What was written.
#[derive(Debug, Clone)]
pub struct ComposeSummary {
    /// Frames in the output file.
    pub frames: u64,
    /// Output duration in seconds.
    pub duration_secs: f64,
    /// Clips in the order they were written.
    pub clips: Vec<ClipSummary>,
}

/// Concatenates clips into the target format.
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    format: TargetFormat,
}

impl Composer {
    pub fn new(format: TargetFormat) -> Self {
        Self { format }
    }

    /// Writes `clips` back to back to `output`, in the order given.
    ///
    /// Takes ownership of every clip and releases each one exactly once,
    /// whether or not the write succeeds. Each clip contributes exactly its
    /// effective duration; there is no cross-fade or padding between clips.
    pub fn compose(
        &self,
        clips: Vec<BoundedClip>,
        output: &Path,
    ) -> Result<ComposeSummary, ComposeError> {
        if clips.is_empty() {
            return Err(ComposeError::NoInput);
        }

        let count = clips.len();
        let result = self.write_all(clips, output);
        match &result {
            Ok(summary) => info!(
                output = %output.display(),
                clips = count,
                duration_secs = summary.duration_secs,
                "mashup written"
            ),
            Err(e) => {
                warn!(output = %output.display(), error = %e, "composition failed");
                remove_partial(output);
            }
        }
        result
    }

    fn write_all(
        &self,
        clips: Vec<BoundedClip>,
        output: &Path,
    ) -> Result<ComposeSummary, ComposeError> {
        // On early return the remaining clips are dropped with the iterator.
        let mut sink = WavSink::create(output, self.format).map_err(ComposeError::from_sink)?;

        let mut summaries = Vec::with_capacity(clips.len());
        for mut clip in clips {
            let limit = self.format.frames_for(clip.effective_duration_secs());
            let samples = clip.read_bounded().map_err(|e| {
                ComposeError::WriteFailed(format!("reading {}: {}", clip.track().label(), e.message))
            })?;
            let converted = conform(
                &samples,
                clip.sample_rate(),
                clip.channels(),
                self.format,
                limit,
            )
            .map_err(|e| ComposeError::WriteFailed(e.message))?;
            let frames = converted.len() / self.format.channels.max(1) as usize;
            if frames < limit {
                warn!(
                    track = %clip.track().label(),
                    expected = limit,
                    decoded = frames,
                    "clip shorter than its reported duration"
                );
            }
            sink.write_interleaved(&converted)
                .map_err(ComposeError::from_sink)?;

            let mut summary = clip.summary();
            summary.effective_duration_secs =
                frames_to_duration(frames as u64, self.format.sample_rate);
            summaries.push(summary);
            debug!(track = %clip.track().label(), frames, "clip written, releasing");
            drop(clip);
        }

        let frames = sink.finalize().map_err(ComposeError::from_sink)?;

        Ok(ComposeSummary {
            frames,
            duration_secs: frames_to_duration(frames, self.format.sample_rate),
            clips: summaries,
        })
    }
}

impl ComposeError {
    fn from_sink(e: MashupError) -> Self {
        ComposeError::WriteFailed(e.message)
    }
}

fn remove_partial(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => debug!(output = %output.display(), "partial output removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(output = %output.display(), error = %e, "failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mashup::testing::{write_track, FakeDecoder, FAKE_RATE};
    use crate::mashup::trim::Trimmer;
    use crate::types::TrackFile;
    use tempfile::tempdir;

    fn clips(dir: &Path, decoder: &FakeDecoder, specs: &[&str], cap: f64) -> Vec<BoundedClip> {
        let tracks: Vec<TrackFile> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let path = write_track(dir, &format!("{:03}.mp3", i), spec);
                TrackFile::new(i, path, format!("t{}", i), "")
            })
            .collect();
        Trimmer::new(decoder).trim(&tracks, cap).clips
    }

    fn read_output(path: &Path) -> (hound::WavSpec, Vec<f32>) {
        let reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader
            .into_samples::<i16>()
            .map(|s| s.unwrap() as f32 / i16::MAX as f32)
            .collect();
        (spec, samples)
    }

    #[test]
    fn concatenates_in_order_with_exact_durations() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["5 0.1", "3 0.2", "7 0.3"], 4.0);
        let output = dir.path().join("out.wav");

        let summary = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &output)
            .unwrap();

        assert_eq!(summary.frames, 11 * FAKE_RATE as u64);
        assert!((summary.duration_secs - 11.0).abs() < 1e-9);
        let durations: Vec<f64> = summary.clips.iter().map(|c| c.effective_duration_secs).collect();
        assert_eq!(durations, vec![4.0, 3.0, 4.0]);

        let (spec, samples) = read_output(&output);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, FAKE_RATE);
        assert_eq!(samples.len(), 11 * FAKE_RATE as usize * 2);

        let at = |secs: f64| samples[(secs * FAKE_RATE as f64) as usize * 2];
        assert!((at(0.5) - 0.1).abs() < 1e-3);
        assert!((at(3.9) - 0.1).abs() < 1e-3);
        assert!((at(4.1) - 0.2).abs() < 1e-3);
        assert!((at(6.9) - 0.2).abs() < 1e-3);
        assert!((at(7.1) - 0.3).abs() < 1e-3);
        assert!((at(10.9) - 0.3).abs() < 1e-3);
    }

    #[test]
    fn short_track_contributes_full_length() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["2 0.5"], 20.0);
        let output = dir.path().join("out.wav");

        let summary = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &output)
            .unwrap();
        assert_eq!(summary.frames, 2 * FAKE_RATE as u64);
    }

    #[test]
    fn resamples_to_target_rate() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["1 0.2", "0.5 0.2"], 20.0);
        let output = dir.path().join("out.wav");

        let summary = Composer::new(TargetFormat::stereo(16_000))
            .compose(clips, &output)
            .unwrap();
        assert_eq!(summary.frames, 24_000);
        assert_eq!(hound::WavReader::open(&output).unwrap().duration(), 24_000);
    }

    #[test]
    fn empty_input_creates_no_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.wav");
        let err = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(Vec::new(), &output)
            .unwrap_err();
        assert_eq!(err, ComposeError::NoInput);
        assert!(!output.exists());
    }

    #[test]
    fn every_clip_released_once_on_success() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["1 0.1", "1 0.2", "1 0.3"], 5.0);

        Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &dir.path().join("out.wav"))
            .unwrap();

        assert_eq!(decoder.counter.opened(), 3);
        assert_eq!(decoder.counter.closed(), 3);
    }

    #[test]
    fn every_clip_released_once_on_write_failure() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["1 0.1", "1 0.2", "1 0.3"], 5.0);
        let output = dir.path().join("no-such-dir").join("out.wav");

        let err = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &output)
            .unwrap_err();

        assert!(matches!(err, ComposeError::WriteFailed(_)));
        assert_eq!(decoder.counter.opened(), 3);
        assert_eq!(decoder.counter.closed(), 3);
        assert!(!output.exists());
    }

    #[test]
    fn short_stream_is_not_padded_with_silence() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        // Reports 5s but only 1s decodes.
        let clips = clips(dir.path(), &decoder, &["5 0.1 1", "3 0.2"], 4.0);
        let output = dir.path().join("out.wav");

        let summary = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &output)
            .unwrap();

        assert_eq!(summary.frames, 4 * FAKE_RATE as u64);
        let durations: Vec<f64> = summary.clips.iter().map(|c| c.effective_duration_secs).collect();
        assert_eq!(durations, vec![1.0, 3.0]);

        let (_, samples) = read_output(&output);
        assert_eq!(samples.len(), 4 * FAKE_RATE as usize * 2);
        assert!(samples.iter().all(|s| s.abs() > 0.05));
    }

    #[test]
    fn every_clip_released_once_on_read_failure() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["1 0.1", "1 0.2 fail", "1 0.3"], 5.0);
        let output = dir.path().join("out.wav");

        let err = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &output)
            .unwrap_err();

        assert!(matches!(err, ComposeError::WriteFailed(_)));
        assert_eq!(decoder.counter.opened(), 3);
        assert_eq!(decoder.counter.closed(), 3);
        assert!(!output.exists());
    }

    #[test]
    fn write_failure_message_has_single_prefix() {
        let dir = tempdir().unwrap();
        let decoder = FakeDecoder::default();
        let clips = clips(dir.path(), &decoder, &["1 0.1"], 5.0);
        let output = dir.path().join("no-such-dir").join("out.wav");

        let err: MashupError = Composer::new(TargetFormat::stereo(FAKE_RATE))
            .compose(clips, &output)
            .unwrap_err()
            .into();

        assert_eq!(err.message.matches("Failed to write mashup").count(), 1);
    }

    #[test]
    fn compose_error_maps_to_error_codes() {
        use crate::error::ErrorCode;
        let e: MashupError = ComposeError::WriteFailed("disk full".into()).into();
        assert_eq!(e.code, ErrorCode::WriteFailed);
        let e: MashupError = ComposeError::NoInput.into();
        assert_eq!(e.code, ErrorCode::NoTracksAvailable);
    }
}
