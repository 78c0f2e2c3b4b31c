//! TrackFile type representing an acquired audio file.
//!
//! Track files are produced by the acquirer and carry an explicit sequence
//! number so that concatenation order never depends on directory listing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File extension of acquired tracks.
pub const TRACK_EXTENSION: &str = "mp3";

/// An audio file fetched from the content source into a working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFile {
    /// Position of the item in the search results, starting at 0.
    /// Defines concatenation order.
    pub sequence: usize,

    /// Full filesystem path to the audio file.
    pub path: PathBuf,

    /// Content source identifier of the item (e.g. a video id).
    pub source_id: String,

    /// Display title reported by the content source.
    pub title: String,
}

impl TrackFile {
    /// Creates a new TrackFile.
    pub fn new(
        sequence: usize,
        path: PathBuf,
        source_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            path,
            source_id: source_id.into(),
            title: title.into(),
        }
    }

    /// Short label used in logs and diagnostics.
    pub fn label(&self) -> String {
        if self.title.is_empty() {
            format!("#{} {}", self.sequence, self.source_id)
        } else {
            format!("#{} {}", self.sequence, self.title)
        }
    }

    /// Returns true if the file has the expected audio extension.
    pub fn has_track_extension(&self) -> bool {
        has_extension(&self.path, TRACK_EXTENSION)
    }
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Computes a run identifier for a run-scoped working directory.
///
/// The id is the first 16 hex characters of the SHA256 hash of
/// `{query}:{nonce}:{counter}`. Callers pass a time-based nonce and a
/// process-wide counter so that concurrent runs for the same query never
/// share a directory.
pub fn compute_run_id(query: &str, nonce: u128, counter: u64) -> String {
    let input = format!("{}:{}:{}", query, nonce, counter);
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_deterministic() {
        let id1 = compute_run_id("arijit songs", 42, 1);
        let id2 = compute_run_id("arijit songs", 42, 1);
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 16);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn run_id_varies_with_counter() {
        let id1 = compute_run_id("arijit songs", 42, 1);
        let id2 = compute_run_id("arijit songs", 42, 2);
        let id3 = compute_run_id("shreya songs", 42, 1);
        assert_ne!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let track = TrackFile::new(0, PathBuf::from("/w/000-abc.MP3"), "abc", "Song");
        assert!(track.has_track_extension());

        let other = TrackFile::new(1, PathBuf::from("/w/001-abc.webm"), "abc", "Song");
        assert!(!other.has_track_extension());
    }

    #[test]
    fn label_falls_back_to_id() {
        let titled = TrackFile::new(3, PathBuf::from("a.mp3"), "xyz", "Tum Hi Ho");
        assert_eq!(titled.label(), "#3 Tum Hi Ho");

        let untitled = TrackFile::new(4, PathBuf::from("b.mp3"), "xyz", "");
        assert_eq!(untitled.label(), "#4 xyz");
    }
}
