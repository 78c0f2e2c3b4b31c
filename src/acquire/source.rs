//! Content source abstraction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One search result from a content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Source-specific item identifier.
    pub id: String,
    /// Display title, possibly empty.
    pub title: String,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Short label used in logs and diagnostics.
    pub fn label(&self, sequence: usize) -> String {
        if self.title.is_empty() {
            format!("#{} {}", sequence, self.id)
        } else {
            format!("#{} {}", sequence, self.title)
        }
    }

    /// File stem used for the fetched file: `{sequence:03}-{id}` with the id
    /// reduced to filename-safe characters.
    pub fn file_stem(&self, sequence: usize) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{:03}-{}", sequence, id)
    }
}

/// External audio source: search once, then fetch each hit independently.
///
/// Implementations own their network timeouts. A fetch that times out is
/// returned as an `Err` for that item only.
pub trait ContentSource: Send + Sync {
    /// Returns up to `count` hits for `query`. Playlists are not expanded.
    fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>>;

    /// Fetches `hit` as an mp3 into `dest_dir` and returns the file path.
    fn fetch(&self, hit: &SearchHit, sequence: usize, dest_dir: &Path) -> Result<PathBuf>;
}
