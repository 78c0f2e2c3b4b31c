//! Conversion of decoded clips to the mashup's target format.
//!
//! Channel layout is mapped to stereo, the sample rate is converted with an
//! FFT resampler, and the result is cut to a frame limit. Missing audio is
//! never padded with silence.

use rubato::{FftFixedIn, Resampler};

use crate::error::{MashupError, Result};

/// Input chunk size for the FFT resampler.
const RESAMPLE_CHUNK: usize = 1024;

/// Output format of the mashup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl TargetFormat {
    /// Stereo at the given rate.
    pub fn stereo(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 2,
        }
    }

    /// Number of output frames for a duration, rounded to the nearest frame.
    pub fn frames_for(&self, duration_secs: f64) -> usize {
        (duration_secs.max(0.0) * self.sample_rate as f64).round() as usize
    }
}

/// Converts interleaved samples to `target`, producing at most
/// `max_frames` frames.
pub fn conform(
    interleaved: &[f32],
    src_rate: u32,
    src_channels: u16,
    target: TargetFormat,
    max_frames: usize,
) -> Result<Vec<f32>> {
    if src_channels == 0 || src_rate == 0 {
        return Err(MashupError::internal("Source audio has no channels or rate"));
    }

    let mut planar = deinterleave(interleaved, src_channels as usize, target.channels as usize);
    if src_rate != target.sample_rate {
        planar = resample(planar, src_rate, target.sample_rate)?;
    }

    for channel in planar.iter_mut() {
        channel.truncate(max_frames);
    }

    Ok(interleave(&planar))
}

/// Splits interleaved samples into `out_channels` planes.
///
/// Mono is duplicated to every output channel; extra source channels beyond
/// `out_channels` are dropped.
fn deinterleave(interleaved: &[f32], src_channels: usize, out_channels: usize) -> Vec<Vec<f32>> {
    let frames = interleaved.len() / src_channels;
    let mut planar = vec![Vec::with_capacity(frames); out_channels];
    for frame in interleaved.chunks_exact(src_channels) {
        for (ch, plane) in planar.iter_mut().enumerate() {
            let src = if src_channels == 1 { 0 } else { ch.min(src_channels - 1) };
            plane.push(frame[src]);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for plane in planar {
            out.push(plane[i]);
        }
    }
    out
}

/// Resamples planar audio from `from` Hz to `to` Hz.
///
/// The resampler's output delay is trimmed so the result is aligned with
/// the input and holds `round(frames * to / from)` frames.
pub fn resample(planar: Vec<Vec<f32>>, from: u32, to: u32) -> Result<Vec<Vec<f32>>> {
    let channels = planar.len();
    let frames = planar.first().map_or(0, Vec::len);
    if from == to || channels == 0 || frames == 0 {
        return Ok(planar);
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, channels)
        .map_err(|e| MashupError::internal(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = ((frames as u64 * to as u64 + from as u64 / 2) / from as u64) as usize;
    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    let mut pos = 0;
    while frames - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar.iter().map(|p| &p[pos..pos + n]).collect();
        let processed = resampler
            .process(&chunk, None)
            .map_err(|e| MashupError::internal(format!("Resampling failed: {}", e)))?;
        append(&mut out, processed);
        pos += n;
    }

    if pos < frames {
        let chunk: Vec<&[f32]> = planar.iter().map(|p| &p[pos..]).collect();
        let processed = resampler
            .process_partial(Some(chunk.as_slice()), None)
            .map_err(|e| MashupError::internal(format!("Resampling failed: {}", e)))?;
        append(&mut out, processed);
    }

    // Flush the delay line. Each empty call yields one more output chunk.
    let mut flushes = 0;
    while out[0].len() < expected + delay && flushes < 8 {
        let processed = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| MashupError::internal(format!("Resampling failed: {}", e)))?;
        if processed.first().map_or(true, Vec::is_empty) {
            break;
        }
        append(&mut out, processed);
        flushes += 1;
    }

    for plane in out.iter_mut() {
        plane.drain(..delay.min(plane.len()));
        plane.resize(expected, 0.0);
    }

    Ok(out)
}

fn append(out: &mut [Vec<f32>], processed: Vec<Vec<f32>>) {
    for (plane, chunk) in out.iter_mut().zip(processed) {
        plane.extend_from_slice(&chunk);
    }
}
