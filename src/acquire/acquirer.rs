//! Track acquisition: search once, fetch every hit, tolerate per-item failures.

use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, info, warn};

use super::source::{ContentSource, SearchHit};
use crate::error::{MashupError, Result};
use crate::types::{ItemFailure, TrackFile};

/// Result of one acquisition.
#[derive(Debug, Default)]
pub struct Acquisition {
    /// Fetched tracks, sorted by sequence number.
    pub tracks: Vec<TrackFile>,
    /// Items that could not be fetched (and a failed search, if any).
    pub failures: Vec<ItemFailure>,
}

/// Fetches tracks from a content source into a working directory.
pub struct Acquirer<'a> {
    source: &'a dyn ContentSource,
    workers: usize,
}

impl<'a> Acquirer<'a> {
    /// Creates an acquirer running at most `workers` fetches at once.
    pub fn new(source: &'a dyn ContentSource, workers: usize) -> Self {
        Self {
            source,
            workers: workers.max(1),
        }
    }

    /// Fetches up to `count` tracks for `query` into `dest_dir`.
    ///
    /// `dest_dir` is created if needed and emptied first. Only a failure to
    /// create the directory is an error; search and fetch failures are
    /// recorded in the returned [`Acquisition`].
    pub fn acquire(&self, query: &str, count: usize, dest_dir: &Path) -> Result<Acquisition> {
        fs::create_dir_all(dest_dir).map_err(|e| {
            MashupError::with_source(
                crate::error::ErrorCode::Internal,
                format!("Failed to create working directory {}", dest_dir.display()),
                e,
            )
        })?;

        match clear_dir(dest_dir) {
            Ok(0) => {}
            Ok(n) => debug!(removed = n, dir = %dest_dir.display(), "cleared stale files"),
            Err(e) => {
                warn!(error = %e, dir = %dest_dir.display(), "could not list working directory")
            }
        }

        let mut acquisition = Acquisition::default();

        let hits = match self.source.search(query, count) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query, error = %e.message, "search failed");
                acquisition
                    .failures
                    .push(ItemFailure::acquire(format!("search \"{}\"", query), e.message));
                return Ok(acquisition);
            }
        };

        let hits: Vec<SearchHit> = hits.into_iter().take(count).collect();
        info!(query, requested = count, found = hits.len(), "search complete");

        let mut results = self.fetch_all(&hits, dest_dir);
        results.sort_by_key(|(sequence, _)| *sequence);

        for (sequence, result) in results {
            let hit = &hits[sequence];
            match result {
                Ok(path) => {
                    debug!(sequence, id = %hit.id, path = %path.display(), "fetched");
                    acquisition
                        .tracks
                        .push(TrackFile::new(sequence, path, hit.id.clone(), hit.title.clone()));
                }
                Err(reason) => {
                    warn!(sequence, id = %hit.id, reason = %reason, "fetch failed, skipping");
                    acquisition
                        .failures
                        .push(ItemFailure::acquire(hit.label(sequence), reason));
                }
            }
        }

        info!(
            fetched = acquisition.tracks.len(),
            failed = acquisition.failures.len(),
            "acquisition complete"
        );
        Ok(acquisition)
    }

    /// Fetches every hit on a bounded pool of scoped threads. All fetches
    /// have finished when this returns.
    fn fetch_all(
        &self,
        hits: &[SearchHit],
        dest_dir: &Path,
    ) -> Vec<(usize, std::result::Result<std::path::PathBuf, String>)> {
        let next = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(hits.len()));
        let workers = self.workers.min(hits.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let sequence = next.fetch_add(1, Ordering::SeqCst);
                    let Some(hit) = hits.get(sequence) else {
                        break;
                    };
                    let result = self.fetch_one(hit, sequence, dest_dir);
                    if let Ok(mut guard) = results.lock() {
                        guard.push((sequence, result));
                    }
                });
            }
        });

        results.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fetch_one(
        &self,
        hit: &SearchHit,
        sequence: usize,
        dest_dir: &Path,
    ) -> std::result::Result<std::path::PathBuf, String> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.source.fetch(hit, sequence, dest_dir)
        }));
        match outcome {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(e)) => Err(e.message),
            Err(payload) => Err(format!("fetch panicked: {}", panic_message(&*payload))),
        }
    }
}

/// Removes every file in `dir`, leaving subdirectories alone.
///
/// A missing directory counts as clean. Files that cannot be removed are
/// logged and skipped. Returns the number of files removed.
pub fn clear_dir(dir: &Path) -> io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        let is_file = entry.file_type().map(|t| !t.is_dir()).unwrap_or(false);
        if !is_file {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove file"),
        }
    }
    Ok(removed)
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
