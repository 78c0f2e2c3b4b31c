//! mashup-daemon: builds a single mashup from a singer's songs.
//!
//! A run searches a content source for the singer's tracks, fetches them as
//! mp3 into a run-scoped working directory, bounds every track to its first
//! `duration` seconds, concatenates the clips into one WAV file and cleans up
//! the working directory. The result is kept on disk or zipped and emailed.
//!
//! # Modules
//!
//! - [`acquire`]: content source trait, yt-dlp client and parallel fetching
//! - [`audio`]: decoding, format conversion and WAV output
//! - [`mashup`]: trimming, composition and the pipeline orchestrator
//! - [`delivery`]: zip packaging and email
//! - [`web`]: the web form
//! - [`types`], [`config`], [`error`]: shared data, configuration and errors
//!
//! # Example
//!
//! ```rust,ignore
//! use mashup_daemon::{MashupConfig, MashupRequest, Pipeline};
//!
//! let pipeline = Pipeline::from_config(MashupConfig::from_env());
//! let report = pipeline.execute(&MashupRequest::new("Adele", 12, 25, "adele.wav"))?;
//! println!("{} clips, {:.1}s", report.clips.len(), report.total_duration_secs);
//! ```

pub mod acquire;
pub mod audio;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod mashup;
pub mod types;
pub mod web;

// Re-export commonly used types at crate root for convenience
pub use config::{EmailConfig, MashupConfig};
pub use error::{ErrorCode, MashupError, PipelineError, Result};
pub use mashup::{CancelToken, Pipeline};
pub use types::{MashupReport, MashupRequest, TrackFile};
