//! Daemon configuration module.
//!
//! Contains the process-wide configuration for the mashup daemon: input
//! thresholds, content source settings, working directory location and
//! email credentials. Built once at startup and passed to the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default minimum number of tracks. Requests must ask for strictly more.
pub const DEFAULT_MIN_COUNT: u32 = 10;

/// Default minimum clip duration in seconds. Requests must ask for strictly more.
pub const DEFAULT_MIN_DURATION: u32 = 20;

/// Runtime configuration for the daemon.
///
/// Typically loaded with [`MashupConfig::from_env`] at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MashupConfig {
    /// Root under which run-scoped working directories are created.
    /// If None, uses the platform-specific default cache location.
    pub work_root: Option<PathBuf>,

    /// Requested track counts must be greater than this value.
    pub min_count: u32,

    /// Requested clip durations (seconds) must be greater than this value.
    pub min_duration: u32,

    /// Term appended to the singer name to form the search query.
    pub query_suffix: String,

    /// yt-dlp executable name or path.
    pub ytdlp_path: String,

    /// Maximum number of concurrent track fetches.
    pub fetch_workers: usize,

    /// Per-item network timeout handed to the content source, in seconds.
    pub fetch_timeout_secs: u64,

    /// Sample rate of the composed mashup in Hz.
    pub sample_rate: u32,

    /// Email delivery settings.
    pub email: EmailConfig,

    /// Port for the web form in serve mode.
    pub port: u16,
}

/// SMTP delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Sender address, also used as the SMTP username.
    pub sender: Option<String>,

    /// SMTP password (an app password for Gmail).
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// SMTP relay host. Connections use implicit TLS on port 465.
    pub smtp_host: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            password: None,
            smtp_host: "smtp.gmail.com".to_string(),
        }
    }
}

impl EmailConfig {
    /// Returns true if both sender and password are set.
    pub fn is_configured(&self) -> bool {
        self.sender.as_deref().is_some_and(|s| !s.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl MashupConfig {
    /// Creates a new MashupConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a MashupConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `MASHUP_WORK_DIR` - Root for run-scoped working directories
    /// - `MASHUP_MIN_COUNT` - Track count threshold
    /// - `MASHUP_MIN_DURATION` - Clip duration threshold in seconds
    /// - `MASHUP_QUERY_SUFFIX` - Search term appended to the singer name
    /// - `MASHUP_YTDLP` - yt-dlp executable
    /// - `MASHUP_FETCH_WORKERS` - Concurrent fetches (1-32)
    /// - `MASHUP_FETCH_TIMEOUT` - Per-item network timeout in seconds
    /// - `MASHUP_SAMPLE_RATE` - Output sample rate (8000-192000)
    /// - `MASHUP_PORT` - Web form port
    /// - `MASHUP_SMTP_HOST` - SMTP relay host
    /// - `SENDER_EMAIL` / `APP_PASSWORD` - SMTP credentials
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MASHUP_WORK_DIR") {
            config.work_root = Some(PathBuf::from(path));
        }

        if let Some(min) = env_parse::<u32>("MASHUP_MIN_COUNT") {
            config.min_count = min;
        }

        if let Some(min) = env_parse::<u32>("MASHUP_MIN_DURATION") {
            config.min_duration = min;
        }

        if let Ok(suffix) = std::env::var("MASHUP_QUERY_SUFFIX") {
            config.query_suffix = suffix.trim().to_string();
        }

        if let Ok(path) = std::env::var("MASHUP_YTDLP") {
            if !path.trim().is_empty() {
                config.ytdlp_path = path;
            }
        }

        if let Some(workers) = env_parse::<usize>("MASHUP_FETCH_WORKERS") {
            if (1..=32).contains(&workers) {
                config.fetch_workers = workers;
            }
        }

        if let Some(timeout) = env_parse::<u64>("MASHUP_FETCH_TIMEOUT") {
            if timeout > 0 {
                config.fetch_timeout_secs = timeout;
            }
        }

        if let Some(rate) = env_parse::<u32>("MASHUP_SAMPLE_RATE") {
            if (8_000..=192_000).contains(&rate) {
                config.sample_rate = rate;
            }
        }

        if let Some(port) = env_parse::<u16>("MASHUP_PORT") {
            config.port = port;
        }

        if let Ok(host) = std::env::var("MASHUP_SMTP_HOST") {
            config.email.smtp_host = host;
        }

        config.email.sender = std::env::var("SENDER_EMAIL").ok();
        config.email.password = std::env::var("APP_PASSWORD").ok();

        config
    }

    /// Returns the effective work root, using platform defaults if not specified.
    pub fn effective_work_root(&self) -> PathBuf {
        if let Some(ref path) = self.work_root {
            path.clone()
        } else {
            default_work_root()
        }
    }

    /// Builds the full search query for a singer.
    pub fn search_query(&self, singer: &str) -> String {
        let singer = singer.trim();
        if self.query_suffix.is_empty() {
            singer.to_string()
        } else {
            format!("{} {}", singer, self.query_suffix)
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.fetch_workers == 0 {
            return Some("fetch_workers must be > 0".to_string());
        }
        if self.fetch_workers > 32 {
            return Some(format!("fetch_workers too high: {} (max 32)", self.fetch_workers));
        }
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Some(format!(
                "sample_rate out of range: {} (8000-192000)",
                self.sample_rate
            ));
        }
        if self.ytdlp_path.trim().is_empty() {
            return Some("ytdlp_path cannot be empty".to_string());
        }

        None
    }
}

impl Default for MashupConfig {
    fn default() -> Self {
        Self {
            work_root: None,
            min_count: DEFAULT_MIN_COUNT,
            min_duration: DEFAULT_MIN_DURATION,
            query_suffix: "songs".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            fetch_workers: 4,
            fetch_timeout_secs: 30,
            sample_rate: 44_100,
            email: EmailConfig::default(),
            port: 5000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Returns the platform-specific default root for working directories.
///
/// - macOS: ~/Library/Caches/mashup-daemon/work
/// - Linux: ~/.cache/mashup-daemon/work
/// - Windows: C:\Users\<user>\AppData\Local\mashup-daemon\cache\work
fn default_work_root() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "mashup-daemon") {
        proj_dirs.cache_dir().join("work")
    } else {
        PathBuf::from("./audios")
    }
}
