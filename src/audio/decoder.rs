//! Audio file decoding.
//!
//! [`AudioDecoder`] opens a file and hands back an owned [`AudioStream`].
//! A stream holds the open file and decoder state; dropping it releases
//! both. The production implementation uses symphonia.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use crate::error::{MashupError, Result};

/// Opens audio files as decodable streams.
pub trait AudioDecoder: Send + Sync {
    /// Opens `path` and reads enough of it to know its duration and format.
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>>;
}

/// An open, forward-only audio stream.
///
/// Dropping the stream releases the underlying file handle.
pub trait AudioStream: Send {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of interleaved channels.
    fn channels(&self) -> u16;

    /// Total number of frames in the file.
    fn total_frames(&self) -> u64;

    /// Reads up to `max_frames` frames of interleaved samples.
    ///
    /// Returns an empty vector once the stream is exhausted.
    fn read_frames(&mut self, max_frames: usize) -> Result<Vec<f32>>;

    /// Total duration in seconds.
    fn duration_secs(&self) -> f64 {
        if self.sample_rate() == 0 {
            return 0.0;
        }
        self.total_frames() as f64 / self.sample_rate() as f64
    }
}

/// Decoder backed by symphonia's default codec and format registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>> {
        let mut stream = SymphoniaStream::open(path)?;
        if stream.total_frames == 0 {
            // Container did not report a frame count; count by decoding a
            // second reader so this stream stays at position 0.
            stream.total_frames = SymphoniaStream::open(path)?.count_remaining_frames()?;
        }
        debug!(
            path = %path.display(),
            sample_rate = stream.sample_rate,
            channels = stream.channels,
            frames = stream.total_frames,
            "opened audio stream"
        );
        Ok(Box::new(stream))
    }
}

/// A file being decoded by symphonia.
pub struct SymphoniaStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
    pending: VecDeque<f32>,
    finished: bool,
}

impl SymphoniaStream {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            MashupError::internal(format!("Failed to open audio file {}: {}", path.display(), e))
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_error(path, e))?;

        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| MashupError::internal(format!("No audio track in {}", path.display())))?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| decode_error(path, e))?;

        let mut stream = Self {
            format,
            decoder,
            track_id,
            sample_rate: params.sample_rate.unwrap_or(0),
            channels: params.channels.map(|c| c.count() as u16).unwrap_or(0),
            total_frames: params.n_frames.unwrap_or(0),
            pending: VecDeque::new(),
            finished: false,
        };

        // Some containers only reveal the signal spec once a packet is decoded.
        if stream.sample_rate == 0 || stream.channels == 0 {
            stream.decode_next()?;
            if stream.sample_rate == 0 || stream.channels == 0 {
                return Err(MashupError::internal(format!(
                    "Could not determine audio format of {}",
                    path.display()
                )));
            }
        }

        Ok(stream)
    }

    /// Decodes the next packet of the default track into `pending`.
    ///
    /// Returns false once the stream is exhausted.
    fn decode_next(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return Ok(false);
                }
                Err(e) => {
                    return Err(MashupError::internal(format!("Failed to read packet: {}", e)))
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt frames are common in mp3; skip them.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => {
                    return Err(MashupError::internal(format!("Failed to decode packet: {}", e)))
                }
            };

            let spec = *decoded.spec();
            if self.sample_rate == 0 {
                self.sample_rate = spec.rate;
            }
            if self.channels == 0 {
                self.channels = spec.channels.count() as u16;
            }

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            self.pending.extend(buffer.samples().iter().copied());
            return Ok(true);
        }
    }

    fn count_remaining_frames(mut self) -> Result<u64> {
        let channels = self.channels.max(1) as u64;
        let mut samples = self.pending.len() as u64;
        self.pending.clear();
        while self.decode_next()? {
            samples += self.pending.len() as u64;
            self.pending.clear();
        }
        Ok(samples / channels)
    }
}

impl AudioStream for SymphoniaStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn read_frames(&mut self, max_frames: usize) -> Result<Vec<f32>> {
        let wanted = max_frames * self.channels as usize;
        while self.pending.len() < wanted {
            if !self.decode_next()? {
                break;
            }
        }
        let take = wanted.min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }
}

fn decode_error(path: &Path, e: SymphoniaError) -> MashupError {
    MashupError::with_source(
        crate::error::ErrorCode::Internal,
        format!("Unsupported or corrupt audio file {}", path.display()),
        e,
    )
}
