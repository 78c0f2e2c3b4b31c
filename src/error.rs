//! Error types for the mashup daemon.
//!
//! Defines the error codes used across the pipeline and its invocation
//! surfaces so that every failure is reported as one short, typed outcome.

use std::fmt;

/// Error codes returned by the pipeline and the delivery layer.
///
/// Invocation surfaces render the code plus the message; no paths or
/// backtraces leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Query, count, duration or recipient rejected before any side effect.
    InvalidInput,

    /// Acquisition and trimming together produced zero usable clips.
    NoTracksAvailable,

    /// The composed mashup could not be written to its output path.
    WriteFailed,

    /// The run was cancelled between stages. Cleanup has already run.
    Cancelled,

    /// The mashup could not be packaged into a zip archive.
    PackagingFailed,

    /// The email transport rejected or failed to send the mashup.
    DeliveryFailed,

    /// Email delivery was requested but credentials are not configured.
    ConfigMissing,

    /// Any other failure raised by a collaborator, including panics.
    Internal,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NoTracksAvailable => "NO_TRACKS_AVAILABLE",
            ErrorCode::WriteFailed => "WRITE_FAILED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::PackagingFailed => "PACKAGING_FAILED",
            ErrorCode::DeliveryFailed => "DELIVERY_FAILED",
            ErrorCode::ConfigMissing => "CONFIG_MISSING",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Request parameters are invalid",
            ErrorCode::NoTracksAvailable => "No usable audio tracks were found for the query",
            ErrorCode::WriteFailed => "The mashup file could not be written",
            ErrorCode::Cancelled => "The mashup run was cancelled",
            ErrorCode::PackagingFailed => "The mashup could not be packaged",
            ErrorCode::DeliveryFailed => "The mashup could not be delivered",
            ErrorCode::ConfigMissing => "Email configuration is missing",
            ErrorCode::Internal => "An unexpected internal error occurred",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => {
                "Provide a non-empty singer name, a track count and duration above the \
                 configured minimums, and a valid delivery target"
            }
            ErrorCode::NoTracksAvailable => {
                "Try a different or more popular artist name, or check that yt-dlp and \
                 ffmpeg are installed and have network access"
            }
            ErrorCode::WriteFailed => {
                "Check that the output directory exists, is writable, and has free space"
            }
            ErrorCode::Cancelled => "Submit the request again",
            ErrorCode::PackagingFailed => "Check free disk space next to the output file",
            ErrorCode::DeliveryFailed => {
                "Verify the recipient address and the SMTP credentials, then try again"
            }
            ErrorCode::ConfigMissing => "Set SENDER_EMAIL and APP_PASSWORD in the environment",
            ErrorCode::Internal => "Retry the request; if it keeps failing, check the daemon logs",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for mashup operations.
#[derive(Debug)]
pub struct MashupError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The orchestrator's error type.
pub type PipelineError = MashupError;

impl MashupError {
    /// Creates a new MashupError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new MashupError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an INVALID_INPUT error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, reason)
    }

    /// Creates a NO_TRACKS_AVAILABLE error.
    pub fn no_tracks_available(query: &str) -> Self {
        Self::new(
            ErrorCode::NoTracksAvailable,
            format!("No audio files could be acquired and opened for \"{}\"", query),
        )
    }

    /// Creates a WRITE_FAILED error.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::WriteFailed,
            format!("Failed to write mashup: {}", reason.into()),
        )
    }

    /// Creates a CANCELLED error.
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Run cancelled")
    }

    /// Creates a PACKAGING_FAILED error.
    pub fn packaging_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PackagingFailed,
            format!("Failed to create zip: {}", reason.into()),
        )
    }

    /// Creates a DELIVERY_FAILED error.
    pub fn delivery_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DeliveryFailed,
            format!("Failed to send email: {}", reason.into()),
        )
    }

    /// Creates a CONFIG_MISSING error.
    pub fn config_missing(what: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigMissing,
            format!("Email configuration missing: {}", what.into()),
        )
    }

    /// Creates an INTERNAL error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, reason)
    }

    /// Short message for user-facing surfaces, without the recovery hint.
    pub fn user_message(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for MashupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for MashupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using MashupError.
pub type Result<T> = std::result::Result<T, MashupError>;
