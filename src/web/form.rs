//! Web form page and submission handling.

use std::fs;
use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Form;
use serde::Deserialize;
use tracing::{info, warn};

use super::server::ServerState;
use crate::delivery::{deliver_mashup, mashup_file_name, DeliveryTarget};
use crate::error::{ErrorCode, MashupError, Result};
use crate::mashup::pipeline::next_run_id;
use crate::types::MashupRequest;

pub const SUCCESS_MESSAGE: &str = "Mashup sent to your email successfully!";

pub const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Mashup</title></head>
<body>
  <h1>Mashup Generator</h1>
  <form method="post" action="/">
    <label>Singer name <input type="text" name="singer" required></label><br>
    <label>Number of videos <input type="number" name="videos" min="11" required></label><br>
    <label>Duration of each clip (seconds) <input type="number" name="duration" min="21" required></label><br>
    <label>Email <input type="email" name="email" required></label><br>
    <button type="submit">Create mashup</button>
  </form>
</body>
</html>
"#;

/// Form fields posted by the page.
#[derive(Debug, Deserialize)]
pub struct MashupForm {
    pub singer: String,
    pub videos: u32,
    pub duration: u32,
    pub email: String,
}

pub async fn home() -> impl IntoResponse {
    Html(FORM_PAGE)
}

pub async fn submit(State(state): State<ServerState>, Form(form): Form<MashupForm>) -> impl IntoResponse {
    info!(singer = %form.singer, videos = form.videos, duration = form.duration, "mashup requested");

    match handle(state, form).await {
        Ok(()) => (StatusCode::OK, SUCCESS_MESSAGE.to_string()),
        Err(e) => {
            warn!(code = %e.code, error = %e.message, "mashup request failed");
            let status = match e.code {
                ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorCode::NoTracksAvailable => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, format!("Error: {}", public_message(&e)))
        }
    }
}

/// Renders an error for the browser. Only input errors, which echo the
/// submitted fields, keep their message; everything else is reduced to the
/// code's description so no server paths leak.
fn public_message(e: &MashupError) -> String {
    match e.code {
        ErrorCode::InvalidInput => e.user_message(),
        code => format!("[{}] {}", code.as_str(), code.description()),
    }
}

async fn handle(state: ServerState, form: MashupForm) -> Result<()> {
    DeliveryTarget::Email(form.email.clone()).validate()?;
    let mailer = state.mailer.clone().ok_or_else(|| {
        MashupError::config_missing("SENDER_EMAIL and APP_PASSWORD must be set for email delivery")
    })?;

    let outbox = state
        .pipeline
        .config()
        .effective_work_root()
        .join(format!("outbox-{}", next_run_id(&form.singer)));
    let request = MashupRequest::new(
        form.singer.as_str(),
        form.videos,
        form.duration,
        outbox.join(mashup_file_name(&form.singer)),
    );
    request.validate(state.pipeline.config())?;

    let pipeline = state.pipeline.clone();
    let recipient = form.email;
    tokio::task::spawn_blocking(move || {
        let result = fs::create_dir_all(&outbox)
            .map_err(|e| {
                MashupError::write_failed(format!("cannot create outbox {}: {}", outbox.display(), e))
            })
            .and_then(|_| pipeline.execute(&request))
            .and_then(|report| deliver_mashup(mailer.as_ref(), &recipient, &report.output));
        remove_outbox(outbox);
        result
    })
    .await
    .map_err(|e| MashupError::internal(format!("Mashup task failed: {}", e)))?
}

fn remove_outbox(outbox: PathBuf) {
    if outbox.exists() {
        if let Err(e) = fs::remove_dir_all(&outbox) {
            warn!(dir = %outbox.display(), error = %e, "failed to remove outbox");
        }
    }
}
