//! WAV file writer for the composed mashup.
//!
//! Writes interleaved audio to 16-bit PCM WAV using the hound crate,
//! one clip at a time.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::convert::TargetFormat;
use crate::error::{ErrorCode, MashupError, Result};

/// Bits per sample of the mashup file.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Streaming WAV writer in the mashup's target format.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    channels: u16,
    frames_written: u64,
}

impl WavSink {
    /// Creates (or truncates) the WAV file at `path`.
    pub fn create(path: &Path, format: TargetFormat) -> Result<Self> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, spec)
            .map_err(|e| sink_error(format!("cannot create {}: {}", path.display(), e)))?;

        Ok(Self {
            writer,
            channels: format.channels,
            frames_written: 0,
        })
    }

    /// Appends interleaved f32 samples, clamped to the 16-bit range.
    pub fn write_interleaved(&mut self, samples: &[f32]) -> Result<()> {
        for sample in samples {
            let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            self.writer
                .write_sample(s)
                .map_err(|e| sink_error(format!("cannot write sample: {}", e)))?;
        }
        self.frames_written += (samples.len() / self.channels.max(1) as usize) as u64;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flushes the header and data. Returns the number of frames written.
    pub fn finalize(self) -> Result<u64> {
        let frames = self.frames_written;
        self.writer
            .finalize()
            .map_err(|e| sink_error(format!("cannot finalize WAV file: {}", e)))?;
        Ok(frames)
    }
}

/// Sink errors carry the bare reason; callers add their own context.
fn sink_error(reason: String) -> MashupError {
    MashupError::new(ErrorCode::WriteFailed, reason)
}

/// Calculates the duration of audio in seconds from a frame count.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}
