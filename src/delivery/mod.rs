//! Delivery of finished mashups.
//!
//! A mashup is either left at its output path or packaged into a zip and
//! emailed. Email delivery removes the mashup and the zip afterwards, whether
//! or not sending succeeded.

pub mod email;
pub mod package;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use email::{valid_email, Deliver, SmtpMailer};
pub use package::{package_zip, zip_path_for};

use crate::error::{MashupError, Result};

/// Where a finished mashup goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// Keep the mashup at this path.
    File(PathBuf),
    /// Zip the mashup and email it to this address.
    Email(String),
}

impl DeliveryTarget {
    /// Rejects malformed email recipients before any work is done.
    pub fn validate(&self) -> Result<()> {
        match self {
            DeliveryTarget::Email(address) if !valid_email(address) => {
                Err(MashupError::invalid_input("Invalid Email Address"))
            }
            _ => Ok(()),
        }
    }
}

/// File name used for a singer's mashup.
///
/// Only letters, digits, `-`, `_` and `.` are kept; everything else,
/// including spaces and path separators, becomes `_`. Leading dots are
/// dropped so the name can never be hidden or climb out of its directory.
pub fn mashup_file_name(singer: &str) -> String {
    let safe: String = singer
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_start_matches('.');
    if safe.is_empty() {
        "mashup.wav".to_string()
    } else {
        format!("{}_mashup.wav", safe)
    }
}

/// Packages `mashup`, sends it to `recipient` and removes both files.
///
/// Cleanup runs regardless of the delivery outcome.
pub fn deliver_mashup(mailer: &dyn Deliver, recipient: &str, mashup: &Path) -> Result<()> {
    let result = package_zip(mashup).and_then(|zip| {
        let sent = mailer.deliver(recipient, &zip);
        remove_artifact(&zip);
        sent
    });
    remove_artifact(mashup);

    if let Err(e) = &result {
        warn!(recipient, code = %e.code, error = %e.message, "delivery failed");
    }
    result
}

fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "artifact removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove artifact"),
    }
}
