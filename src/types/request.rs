//! MashupRequest type: the immutable input of one pipeline run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::MashupConfig;
use crate::error::{MashupError, Result};

/// A request for one mashup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MashupRequest {
    /// Singer or free-text query. Must be non-empty after trimming.
    pub query: String,

    /// Number of tracks to fetch. Must exceed the configured minimum.
    pub count: u32,

    /// Per-track clip ceiling in seconds. Must exceed the configured minimum.
    pub duration_secs: u32,

    /// Path of the composed mashup.
    pub output: PathBuf,
}

impl MashupRequest {
    /// Creates a new request. Call [`MashupRequest::validate`] before use.
    pub fn new(
        query: impl Into<String>,
        count: u32,
        duration_secs: u32,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            query: query.into(),
            count,
            duration_secs,
            output: output.into(),
        }
    }

    /// Checks the request against the configured thresholds.
    pub fn validate(&self, config: &MashupConfig) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(MashupError::invalid_input("Singer name cannot be empty"));
        }

        if self.count <= config.min_count {
            return Err(MashupError::invalid_input(format!(
                "Number of videos must be greater than {} (got {})",
                config.min_count, self.count
            )));
        }

        if self.duration_secs <= config.min_duration {
            return Err(MashupError::invalid_input(format!(
                "Duration must be greater than {} seconds (got {})",
                config.min_duration, self.duration_secs
            )));
        }

        if self.output.as_os_str().is_empty() {
            return Err(MashupError::invalid_input("Output file name cannot be empty"));
        }

        Ok(())
    }
}
