//! Run outcome types: pipeline stages, per-item diagnostics and the report.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stage of a pipeline run.
///
/// Transitions: Idle -> Acquiring -> Trimming -> Composing -> Done, with any
/// stage able to move to Failed. Done and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Acquiring,
    Trimming,
    Composing,
    Done,
    Failed,
}

impl PipelineStage {
    /// Returns the string representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Acquiring => "acquiring",
            PipelineStage::Trimming => "trimming",
            PipelineStage::Composing => "composing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    /// Returns true for Done and Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (Done, _) | (Failed, _) => false,
            (_, Failed) => true,
            (Idle, Acquiring) => true,
            (Acquiring, Trimming) => true,
            (Trimming, Composing) => true,
            (Composing, Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage that produced a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Acquire,
    Trim,
}

/// A per-item failure. Recorded, logged, never fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub stage: FailureStage,
    /// Item label (track label, search query or file name).
    pub label: String,
    pub reason: String,
}

impl ItemFailure {
    pub fn acquire(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Acquire,
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn trim(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Trim,
            label: label.into(),
            reason: reason.into(),
        }
    }
}

/// One clip as it went into the mashup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSummary {
    pub sequence: usize,
    pub label: String,
    pub source_duration_secs: f64,
    pub effective_duration_secs: f64,
}

/// The outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MashupReport {
    /// Run identifier (names the run-scoped working directory).
    pub run_id: String,
    /// Path of the composed mashup.
    pub output: PathBuf,
    /// Clips in concatenation order.
    pub clips: Vec<ClipSummary>,
    /// Duration of the written mashup in seconds.
    pub total_duration_secs: f64,
    /// Per-item failures from acquisition and trimming.
    pub diagnostics: Vec<ItemFailure>,
}
