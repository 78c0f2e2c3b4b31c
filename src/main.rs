//! mashup-daemon: builds a mashup of a singer's songs.
//!
//! This binary can run in two modes:
//! - CLI mode: build one mashup and write or email it
//! - Serve mode: web form that emails mashups on request

use std::sync::Arc;
use std::time::Instant;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mashup_daemon::cli::Cli;
use mashup_daemon::config::MashupConfig;
use mashup_daemon::delivery::{deliver_mashup, Deliver, DeliveryTarget, SmtpMailer};
use mashup_daemon::error::{MashupError, Result};
use mashup_daemon::mashup::Pipeline;
use mashup_daemon::web::{run_server, ServerState};

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

fn init_logging() {
    // Logs go to stderr so `--json` output on stdout stays parseable.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("MASHUP_LOG")
                .from_env_lossy(),
        )
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = MashupConfig::from_env();
    if let Some(problem) = config.validate() {
        return Err(MashupError::invalid_input(format!(
            "Invalid configuration: {}",
            problem
        )));
    }

    if cli.is_serve_mode() {
        run_serve_mode(&cli, config)
    } else {
        run_cli_mode(&cli, config)
    }
}

/// Builds one mashup and delivers it.
fn run_cli_mode(cli: &Cli, config: MashupConfig) -> Result<()> {
    let request = cli.request()?;
    let target = cli.delivery_target();
    target.validate()?;

    // Fail before any download when email delivery cannot work.
    let mailer = match &target {
        DeliveryTarget::Email(_) => Some(SmtpMailer::from_config(&config.email)?),
        DeliveryTarget::File(_) => None,
    };

    eprintln!("=== mashup-daemon ===");
    eprintln!("Singer: \"{}\"", request.query);
    eprintln!("Tracks: {}", request.count);
    eprintln!("Clip duration: {}s", request.duration_secs);
    match &target {
        DeliveryTarget::File(path) => eprintln!("Output: {}", path.display()),
        DeliveryTarget::Email(address) => eprintln!("Email: {}", address),
    }
    eprintln!();

    let pipeline = Pipeline::from_config(config);
    let start_time = Instant::now();
    let report = pipeline.execute(&request)?;

    eprintln!("Mashup created successfully");
    eprintln!("  Time: {:.2}s", start_time.elapsed().as_secs_f32());
    eprintln!("  Clips: {}", report.clips.len());
    eprintln!("  Duration: {:.2}s", report.total_duration_secs);
    if !report.diagnostics.is_empty() {
        eprintln!("  Skipped: {}", report.diagnostics.len());
        for failure in &report.diagnostics {
            eprintln!("    {}: {}", failure.label, failure.reason);
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| MashupError::internal(format!("Failed to serialize report: {}", e)))?;
        println!("{}", json);
    }

    if let (Some(mailer), DeliveryTarget::Email(address)) = (mailer, &target) {
        deliver_mashup(&mailer, address, &report.output)?;
        eprintln!("Mashup sent to {}", address);
    } else {
        eprintln!("Saved to: {}", report.output.display());
    }

    Ok(())
}

/// Serves the web form until the process is stopped.
fn run_serve_mode(cli: &Cli, config: MashupConfig) -> Result<()> {
    let port = cli.port.unwrap_or(config.port);
    let mailer: Option<Arc<dyn Deliver>> = match SmtpMailer::from_config(&config.email) {
        Ok(mailer) => Some(Arc::new(mailer)),
        Err(e) => {
            tracing::warn!(error = %e.message, "email delivery disabled");
            None
        }
    };

    eprintln!("=== mashup-daemon web form ===");
    eprintln!("Listening on http://127.0.0.1:{}", port);
    eprintln!();

    let state = ServerState::new(Pipeline::from_config(config), mailer);
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| MashupError::internal(format!("Failed to start runtime: {}", e)))?;
    runtime
        .block_on(run_server(state, port))
        .map_err(|e| MashupError::internal(format!("Server failed: {}", e)))
}
