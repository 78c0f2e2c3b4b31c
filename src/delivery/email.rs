//! Email delivery of packaged mashups over SMTP.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use regex::Regex;
use tracing::info;

use crate::config::EmailConfig;
use crate::error::{MashupError, Result};

pub const SUBJECT: &str = "Your Mashup File";

const BODY: &str = "Hi,\n\nYour mashup is attached.\n\nEnjoy!\n";

/// Sends an artifact to a recipient.
pub trait Deliver: Send + Sync {
    fn deliver(&self, recipient: &str, artifact: &Path) -> Result<()>;
}

/// Returns true if `address` looks like a deliverable email address.
pub fn valid_email(address: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(address))
}

/// SMTP mailer using implicit TLS (port 465) against the configured relay.
pub struct SmtpMailer {
    host: String,
    sender: String,
    password: String,
}

impl SmtpMailer {
    /// Builds a mailer from the email configuration.
    ///
    /// Fails with `ConfigMissing` when the sender or password is unset.
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        match (&config.sender, &config.password) {
            (Some(sender), Some(password)) if config.is_configured() => Ok(Self {
                host: config.smtp_host.clone(),
                sender: sender.clone(),
                password: password.clone(),
            }),
            _ => Err(MashupError::config_missing(
                "SENDER_EMAIL and APP_PASSWORD must be set for email delivery",
            )),
        }
    }

    /// Builds the message with `artifact` attached as a zip.
    pub fn build_message(&self, recipient: &str, artifact: &Path) -> Result<Message> {
        let from: Mailbox = self
            .sender
            .parse()
            .map_err(|e| MashupError::config_missing(format!("Invalid sender address: {}", e)))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| MashupError::invalid_input(format!("Invalid Email Address: {}", e)))?;

        let filename = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mashup.zip".to_string());
        let bytes = fs::read(artifact).map_err(|e| {
            MashupError::delivery_failed(format!("could not read {}: {}", filename, e))
        })?;
        let zip_type = ContentType::parse("application/zip")
            .map_err(|e| MashupError::internal(format!("Invalid content type: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(BODY.to_string()))
                    .singlepart(Attachment::new(filename).body(bytes, zip_type)),
            )
            .map_err(|e| MashupError::delivery_failed(format!("could not build message: {}", e)))
    }
}

impl Deliver for SmtpMailer {
    fn deliver(&self, recipient: &str, artifact: &Path) -> Result<()> {
        let message = self.build_message(recipient, artifact)?;

        let transport = SmtpTransport::relay(&self.host)
            .map_err(|e| MashupError::delivery_failed(format!("SMTP relay {}: {}", self.host, e)))?
            .credentials(Credentials::new(self.sender.clone(), self.password.clone()))
            .build();

        transport
            .send(&message)
            .map_err(|e| MashupError::delivery_failed(e.to_string()))?;

        info!(recipient, host = %self.host, "mashup emailed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::tempdir;

    fn configured() -> EmailConfig {
        EmailConfig {
            sender: Some("sender@example.com".to_string()),
            password: Some("app-password".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn email_validation() {
        assert!(valid_email("someone@example.com"));
        assert!(valid_email("first.last-1@mail.example.org"));
        assert!(!valid_email("no-at-sign.example.com"));
        assert!(!valid_email("user@nodot"));
        assert!(!valid_email("user name@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn missing_credentials_is_config_missing() {
        let err = SmtpMailer::from_config(&EmailConfig::default()).err().unwrap();
        assert_eq!(err.code, ErrorCode::ConfigMissing);

        let mut half = configured();
        half.password = Some(String::new());
        assert!(SmtpMailer::from_config(&half).is_err());
    }

    #[test]
    fn message_carries_subject_and_attachment() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("artist_mashup.zip");
        fs::write(&artifact, b"PK\x03\x04").unwrap();

        let mailer = SmtpMailer::from_config(&configured()).unwrap();
        let message = mailer.build_message("to@example.com", &artifact).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("Subject: Your Mashup File"));
        assert!(raw.contains("To: to@example.com"));
        assert!(raw.contains("application/zip"));
        assert!(raw.contains("artist_mashup.zip"));
    }

    #[test]
    fn unreadable_artifact_is_delivery_failure() {
        let dir = tempdir().unwrap();
        let mailer = SmtpMailer::from_config(&configured()).unwrap();
        let err = mailer
            .build_message("to@example.com", &dir.path().join("missing.zip"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeliveryFailed);
    }
}
