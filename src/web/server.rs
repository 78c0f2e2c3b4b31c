//! HTTP server for the mashup web form.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tracing::info;

use super::form::{home, submit};
use crate::delivery::Deliver;
use crate::mashup::Pipeline;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Pipeline shared by concurrent requests; each run gets its own directory.
    pub pipeline: Arc<Pipeline>,
    /// Mail transport, absent when credentials are not configured.
    pub mailer: Option<Arc<dyn Deliver>>,
}

impl ServerState {
    pub fn new(pipeline: Pipeline, mailer: Option<Arc<dyn Deliver>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            mailer,
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home).post(submit))
        .with_state(state)
}

/// Serves the form on `127.0.0.1:<port>` until the process exits.
pub async fn run_server(state: ServerState, port: u16) -> anyhow::Result<()> {
    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!(port, "serving mashup form");
    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MashupConfig;
    use crate::error::{MashupError, Result};
    use crate::mashup::testing::{FakeDecoder, FakeSource, FAKE_RATE};
    use crate::web::form::SUCCESS_MESSAGE;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::path::{Component, Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, PathBuf)>>,
    }

    impl Deliver for RecordingMailer {
        fn deliver(&self, recipient: &str, artifact: &Path) -> Result<()> {
            if !artifact.exists() {
                return Err(MashupError::delivery_failed("artifact missing"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), artifact.to_path_buf()));
            Ok(())
        }
    }

    fn state(root: &TempDir, tracks: &[&str], mailer: Option<Arc<RecordingMailer>>) -> ServerState {
        let mut config = MashupConfig::new();
        config.work_root = Some(root.path().join("work"));
        config.min_count = 1;
        config.min_duration = 1;
        config.sample_rate = FAKE_RATE;
        let pipeline = Pipeline::new(
            config,
            Box::new(FakeSource::with_tracks(tracks)),
            Box::new(FakeDecoder::default()),
        );
        ServerState::new(pipeline, mailer.map(|m| m as Arc<dyn Deliver>))
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn get_renders_form() {
        let root = tempdir().unwrap();
        let app = make_app(state(&root, &[], None));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("<form"));
        for field in ["singer", "videos", "duration", "email"] {
            assert!(text.contains(&format!("name=\"{}\"", field)));
        }
    }

    #[tokio::test]
    async fn valid_submission_is_emailed_and_cleaned_up() {
        let root = tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let app = make_app(state(&root, &["2 0.1", "2 0.2"], Some(mailer.clone())));

        let response = app
            .oneshot(post("singer=Some+Singer&videos=2&duration=5&email=fan%40example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, SUCCESS_MESSAGE);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "fan@example.com");
        assert_eq!(
            sent[0].1.file_name().unwrap().to_string_lossy(),
            "Some_Singer_mashup.zip"
        );
        let leftovers = std::fs::read_dir(root.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn singer_cannot_steer_output_outside_outbox() {
        let root = tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let app = make_app(state(&root, &["2 0.1"], Some(mailer.clone())));

        let response = app
            .oneshot(post("singer=..%2F..%2Fescaped&videos=2&duration=5&email=fan%40example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = mailer.sent.lock().unwrap();
        let zip = &sent[0].1;
        assert!(zip.starts_with(root.path().join("work")));
        assert!(zip.components().all(|c| c != Component::ParentDir));
        assert_eq!(zip.file_name().unwrap().to_string_lossy(), "_.._escaped_mashup.zip");
        assert!(!root.path().join("escaped_mashup.zip").exists());
    }

    #[tokio::test]
    async fn singer_with_slash_is_accepted() {
        let root = tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let app = make_app(state(&root, &["2 0.1"], Some(mailer.clone())));

        let response = app
            .oneshot(post("singer=AC%2FDC&videos=2&duration=5&email=fan%40example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].1.file_name().unwrap().to_string_lossy(), "AC_DC_mashup.zip");
    }

    #[tokio::test]
    async fn failure_reply_contains_no_server_paths() {
        let root = tempdir().unwrap();
        // A regular file where the work root should be makes every write fail.
        std::fs::write(root.path().join("work"), b"").unwrap();
        let app = make_app(state(
            &root,
            &["2 0.1"],
            Some(Arc::new(RecordingMailer::default())),
        ));

        let response = app
            .oneshot(post("singer=A&videos=2&duration=5&email=a%40b.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert!(text.starts_with("Error: [WRITE_FAILED]"));
        assert!(!text.contains('/'));
        assert!(!text.contains(&*root.path().to_string_lossy()));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_before_running() {
        let root = tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let app = make_app(state(&root, &["2 0.1"], Some(mailer.clone())));

        let response = app
            .oneshot(post("singer=A&videos=2&duration=5&email=not-an-email"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Invalid Email Address"));
        assert!(mailer.sent.lock().unwrap().is_empty());
        assert!(!root.path().join("work").exists());
    }

    #[tokio::test]
    async fn thresholds_are_enforced() {
        let root = tempdir().unwrap();
        let app = make_app(state(
            &root,
            &["2 0.1"],
            Some(Arc::new(RecordingMailer::default())),
        ));

        let response = app
            .oneshot(post("singer=A&videos=1&duration=5&email=a%40b.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.starts_with("Error: [INVALID_INPUT]"));
    }

    #[tokio::test]
    async fn missing_mail_config_is_reported() {
        let root = tempdir().unwrap();
        let app = make_app(state(&root, &["2 0.1"], None));

        let response = app
            .oneshot(post("singer=A&videos=2&duration=5&email=a%40b.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("CONFIG_MISSING"));
    }

    #[tokio::test]
    async fn malformed_number_is_rejected() {
        let root = tempdir().unwrap();
        let app = make_app(state(&root, &[], None));

        let response = app
            .oneshot(post("singer=A&videos=many&duration=5&email=a%40b.com"))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn no_tracks_is_reported() {
        let root = tempdir().unwrap();
        let app = make_app(state(
            &root,
            &[],
            Some(Arc::new(RecordingMailer::default())),
        ));

        let response = app
            .oneshot(post("singer=A&videos=3&duration=5&email=a%40b.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("NO_TRACKS_AVAILABLE"));
        let leftovers = std::fs::read_dir(root.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
