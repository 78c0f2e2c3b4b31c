//! In-memory collaborators for pipeline tests.
//!
//! Track files hold a tiny text description instead of audio:
//! `"<duration_secs> <sample_value> [fail | <decodable_secs>]"`, or
//! `"corrupt"` to fail opening. A trailing `fail` makes every read error; a
//! trailing number makes the stream end early while still reporting the full
//! duration.
//! The fake decoder counts every stream it opens and every stream dropped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::acquire::{ContentSource, SearchHit};
use crate::audio::{AudioDecoder, AudioStream};
use crate::error::{MashupError, Result};

pub const FAKE_RATE: u32 = 8_000;

#[derive(Debug, Default, Clone)]
pub struct HandleCounter {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl HandleCounter {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeDecoder {
    pub counter: HandleCounter,
    pub panic_on_open: bool,
}

impl AudioDecoder for FakeDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>> {
        if self.panic_on_open {
            panic!("decoder crashed");
        }
        let text = fs::read_to_string(path)
            .map_err(|e| MashupError::internal(format!("open failed: {}", e)))?;
        let mut parts = text.split_whitespace();
        let duration: f64 = parts
            .next()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| MashupError::internal("corrupt file"))?;
        let value: f32 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
        let total_frames = (duration * FAKE_RATE as f64).round() as u64;
        let (fail_reads, decodable_frames) = match parts.next() {
            Some("fail") => (true, total_frames),
            Some(secs) => (
                false,
                secs.parse::<f64>()
                    .map(|s| (s * FAKE_RATE as f64).round() as u64)
                    .unwrap_or(total_frames)
                    .min(total_frames),
            ),
            None => (false, total_frames),
        };

        self.counter.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            total_frames,
            decodable_frames,
            fail_reads,
            position: 0,
            value,
            closed: Arc::clone(&self.counter.closed),
        }))
    }
}

pub struct FakeStream {
    total_frames: u64,
    decodable_frames: u64,
    fail_reads: bool,
    position: u64,
    value: f32,
    closed: Arc<AtomicUsize>,
}

impl AudioStream for FakeStream {
    fn sample_rate(&self) -> u32 {
        FAKE_RATE
    }

    fn channels(&self) -> u16 {
        1
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn read_frames(&mut self, max_frames: usize) -> Result<Vec<f32>> {
        if self.fail_reads {
            return Err(MashupError::internal("stream truncated"));
        }
        let n = (self.decodable_frames - self.position).min(max_frames as u64);
        self.position += n;
        Ok(vec![self.value; n as usize])
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Content source serving a fixed list of track descriptions.
#[derive(Default)]
pub struct FakeSource {
    /// One entry per search hit, written verbatim as the track file.
    pub tracks: Vec<String>,
    /// Sequences whose fetch fails.
    pub failing: Vec<usize>,
    pub panic_on_search: bool,
    pub searches: AtomicUsize,
    pub fetches: AtomicUsize,
    /// Every query passed to `search`.
    pub queries: Mutex<Vec<String>>,
    /// Called after every fetch; used to cancel mid-run.
    pub on_fetch: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl FakeSource {
    pub fn with_tracks(tracks: &[&str]) -> Self {
        Self {
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst) + self.fetches.load(Ordering::SeqCst)
    }
}

impl ContentSource for FakeSource {
    fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if self.panic_on_search {
            panic!("search client crashed");
        }
        Ok((0..self.tracks.len().min(count))
            .map(|i| SearchHit::new(format!("t{}", i), format!("Track {}", i)))
            .collect())
    }

    fn fetch(&self, hit: &SearchHit, sequence: usize, dest_dir: &Path) -> Result<PathBuf> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(hook) = self.on_fetch.lock() {
            if let Some(hook) = hook.as_ref() {
                hook();
            }
        }
        if self.failing.contains(&sequence) {
            return Err(MashupError::internal("unavailable"));
        }
        let path = dest_dir.join(format!("{}.mp3", hit.file_stem(sequence)));
        fs::write(&path, &self.tracks[sequence])
            .map_err(|e| MashupError::internal(e.to_string()))?;
        Ok(path)
    }
}

/// Writes track description files directly, for trimmer/composer tests.
pub fn write_track(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}
