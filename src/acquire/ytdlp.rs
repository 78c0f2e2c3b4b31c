//! Content source backed by the `yt-dlp` executable.
//!
//! Search uses `ytsearchN:` with a flat listing so no media is downloaded;
//! each hit is then fetched on its own and converted to mp3 by yt-dlp's
//! ffmpeg post-processor.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use super::source::{ContentSource, SearchHit};
use crate::config::MashupConfig;
use crate::error::{MashupError, Result};
use crate::types::TRACK_EXTENSION;

/// Target bitrate passed to the audio extractor.
pub const AUDIO_QUALITY: &str = "192K";

/// yt-dlp process wrapper.
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    program: String,
    socket_timeout_secs: u64,
}

impl YtDlpSource {
    pub fn new(program: impl Into<String>, socket_timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            socket_timeout_secs,
        }
    }

    pub fn from_config(config: &MashupConfig) -> Self {
        Self::new(config.ytdlp_path.clone(), config.fetch_timeout_secs)
    }

    /// Arguments for the search call.
    pub fn search_args(&self, query: &str, count: usize) -> Vec<String> {
        vec![
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--ignore-errors".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--print".to_string(),
            "%(id)s\t%(title)s".to_string(),
            format!("ytsearch{}:{}", count, query),
        ]
    }

    /// Arguments for fetching one hit into `dest_dir`.
    pub fn fetch_args(&self, hit: &SearchHit, sequence: usize, dest_dir: &Path) -> Vec<String> {
        let template = dest_dir.join(format!("{}.%(ext)s", hit.file_stem(sequence)));
        vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            TRACK_EXTENSION.to_string(),
            "--audio-quality".to_string(),
            AUDIO_QUALITY.to_string(),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            format!("https://www.youtube.com/watch?v={}", hit.id),
        ]
    }

    fn run(&self, args: &[String]) -> Result<Output> {
        debug!(program = %self.program, ?args, "running yt-dlp");
        Command::new(&self.program).args(args).output().map_err(|e| {
            MashupError::with_source(
                crate::error::ErrorCode::Internal,
                format!("Failed to run {}", self.program),
                e,
            )
        })
    }
}

impl ContentSource for YtDlpSource {
    fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>> {
        let output = self.run(&self.search_args(query, count))?;
        // With --ignore-errors a partial listing still exits non-zero.
        let hits = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        if hits.is_empty() && !output.status.success() {
            return Err(MashupError::internal(format!(
                "Search failed: {}",
                last_line(&output.stderr)
            )));
        }
        Ok(hits.into_iter().take(count).collect())
    }

    fn fetch(&self, hit: &SearchHit, sequence: usize, dest_dir: &Path) -> Result<PathBuf> {
        let output = self.run(&self.fetch_args(hit, sequence, dest_dir))?;
        if !output.status.success() {
            return Err(MashupError::internal(format!(
                "Download of {} failed: {}",
                hit.id,
                last_line(&output.stderr)
            )));
        }

        let path = dest_dir.join(format!("{}.{}", hit.file_stem(sequence), TRACK_EXTENSION));
        if !path.is_file() {
            return Err(MashupError::internal(format!(
                "Download of {} produced no {} file",
                hit.id, TRACK_EXTENSION
            )));
        }
        Ok(path)
    }
}

/// Parses `id<TAB>title` lines. Lines without an id are skipped.
pub fn parse_search_output(stdout: &str) -> Vec<SearchHit> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            let (id, title) = match line.split_once('\t') {
                Some((id, title)) => (id.trim(), title.trim()),
                None => (line.trim(), ""),
            };
            if id.is_empty() || id == "NA" {
                None
            } else {
                Some(SearchHit::new(id, title))
            }
        })
        .collect()
}

fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no error output")
        .trim()
        .to_string()
}
