//! Pipeline orchestrator.
//!
//! Runs Acquiring -> Trimming -> Composing for one request inside a
//! run-scoped working directory, guarantees cleanup on every exit path, and
//! maps every failure to a single [`MashupError`].

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::compose::Composer;
use super::trim::Trimmer;
use crate::acquire::acquirer::panic_message;
use crate::acquire::{clear_dir, Acquirer, ContentSource, YtDlpSource};
use crate::audio::{AudioDecoder, SymphoniaDecoder, TargetFormat};
use crate::config::MashupConfig;
use crate::error::{MashupError, Result};
use crate::types::{compute_run_id, MashupReport, MashupRequest, PipelineStage};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cooperative cancellation flag, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Clears and removes a run's working directory when dropped.
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Removes every file in the directory and then the directory itself.
    /// Safe to call repeatedly.
    pub fn cleanup(&self) {
        match clear_dir(&self.dir) {
            Ok(n) if n > 0 => debug!(removed = n, dir = %self.dir.display(), "working files removed"),
            Ok(_) => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "failed to clear working directory"),
        }
        if self.dir.exists() {
            if let Err(e) = fs::remove_dir(&self.dir) {
                warn!(dir = %self.dir.display(), error = %e, "failed to remove working directory");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Tracks the run's stage and logs every transition.
struct StageTracker<'a> {
    run_id: &'a str,
    stage: PipelineStage,
}

impl<'a> StageTracker<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            stage: PipelineStage::Idle,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        info!(run_id = self.run_id, from = %self.stage, to = %next, "stage");
        self.stage = next;
    }
}

/// The mashup pipeline with its collaborators.
pub struct Pipeline {
    config: MashupConfig,
    source: Box<dyn ContentSource>,
    decoder: Box<dyn AudioDecoder>,
}

impl Pipeline {
    /// Creates a pipeline with explicit collaborators.
    pub fn new(
        config: MashupConfig,
        source: Box<dyn ContentSource>,
        decoder: Box<dyn AudioDecoder>,
    ) -> Self {
        Self {
            config,
            source,
            decoder,
        }
    }

    /// Creates a pipeline backed by yt-dlp and symphonia.
    pub fn from_config(config: MashupConfig) -> Self {
        let source = YtDlpSource::from_config(&config);
        Self::new(config, Box::new(source), Box::new(SymphoniaDecoder::new()))
    }

    pub fn config(&self) -> &MashupConfig {
        &self.config
    }

    /// Builds a mashup and returns its path.
    pub fn run(
        &self,
        query: &str,
        count: u32,
        duration_secs: u32,
        output: impl Into<PathBuf>,
    ) -> Result<PathBuf> {
        let request = MashupRequest::new(query, count, duration_secs, output);
        self.execute(&request).map(|report| report.output)
    }

    /// Builds a mashup and returns the full report.
    pub fn execute(&self, request: &MashupRequest) -> Result<MashupReport> {
        self.execute_with_cancel(request, &CancelToken::new())
    }

    /// Like [`Pipeline::execute`], checking `cancel` between stages.
    pub fn execute_with_cancel(
        &self,
        request: &MashupRequest,
        cancel: &CancelToken,
    ) -> Result<MashupReport> {
        request.validate(&self.config)?;

        let run_id = next_run_id(&request.query);
        let workspace = Workspace::new(
            self.config
                .effective_work_root()
                .join(format!("run-{}", run_id)),
        );
        let mut tracker = StageTracker::new(&run_id);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_stages(request, &run_id, workspace.path(), cancel, &mut tracker)
        }))
        .unwrap_or_else(|payload| {
            Err(MashupError::internal(format!(
                "Pipeline stage panicked: {}",
                panic_message(&*payload)
            )))
        });

        // Cleanup happens before the outcome is surfaced.
        drop(workspace);

        match &outcome {
            Ok(_) => tracker.advance(PipelineStage::Done),
            Err(e) => {
                warn!(run_id = %run_id, stage = %tracker.stage, code = %e.code, error = %e.message, "run failed");
                tracker.advance(PipelineStage::Failed);
            }
        }
        outcome
    }

    fn run_stages(
        &self,
        request: &MashupRequest,
        run_id: &str,
        workdir: &Path,
        cancel: &CancelToken,
        tracker: &mut StageTracker<'_>,
    ) -> Result<MashupReport> {
        check_cancel(cancel)?;
        tracker.advance(PipelineStage::Acquiring);
        let query = self.config.search_query(&request.query);
        let acquisition = Acquirer::new(self.source.as_ref(), self.config.fetch_workers).acquire(
            &query,
            request.count as usize,
            workdir,
        )?;

        check_cancel(cancel)?;
        tracker.advance(PipelineStage::Trimming);
        let trimmed =
            Trimmer::new(self.decoder.as_ref()).trim(&acquisition.tracks, request.duration_secs as f64);

        let mut diagnostics = acquisition.failures;
        diagnostics.extend(trimmed.failures);

        if trimmed.clips.is_empty() {
            return Err(MashupError::no_tracks_available(&request.query));
        }

        check_cancel(cancel)?;
        tracker.advance(PipelineStage::Composing);
        let composer = Composer::new(TargetFormat::stereo(self.config.sample_rate));
        let summary = composer.compose(trimmed.clips, &request.output)?;

        Ok(MashupReport {
            run_id: run_id.to_string(),
            output: request.output.clone(),
            clips: summary.clips,
            total_duration_secs: summary.duration_secs,
            diagnostics,
        })
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(MashupError::cancelled())
    } else {
        Ok(())
    }
}

/// Returns a fresh run id; unique per process even for identical queries.
pub(crate) fn next_run_id(query: &str) -> String {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let counter = RUN_COUNTER.fetch_add(1, Ordering::SeqCst);
    compute_run_id(query, nonce, counter)
}
