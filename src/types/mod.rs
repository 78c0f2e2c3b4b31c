//! Core types for the mashup daemon.
//!
//! - [`MashupRequest`]: one validated run request (query, count, duration, output)
//! - [`TrackFile`]: an acquired audio file with its acquisition sequence number
//! - [`MashupReport`]: the outcome of a successful run, with per-item diagnostics

mod report;
mod request;
mod track;

pub use report::{ClipSummary, FailureStage, ItemFailure, MashupReport, PipelineStage};
pub use request::MashupRequest;
pub use track::{compute_run_id, TrackFile, TRACK_EXTENSION};
