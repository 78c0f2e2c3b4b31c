//! CLI argument parser.
//!
//! One-shot mode builds a single mashup; `--serve` starts the web form.

use std::path::PathBuf;

use clap::Parser;

use crate::delivery::{mashup_file_name, DeliveryTarget};
use crate::error::{MashupError, Result};
use crate::types::MashupRequest;

/// mashup-daemon: build a mashup of a singer's songs
#[derive(Parser, Debug)]
#[command(name = "mashup-daemon")]
#[command(about = "Fetches a singer's songs, trims and concatenates them into one mashup")]
#[command(version)]
pub struct Cli {
    /// Singer name to search for
    #[arg(short, long, required_unless_present = "serve")]
    pub singer: Option<String>,

    /// Number of tracks to fetch
    #[arg(short = 'n', long, required_unless_present = "serve")]
    pub count: Option<u32>,

    /// Seconds taken from the start of each track
    #[arg(short, long, required_unless_present = "serve")]
    pub duration: Option<u32>,

    /// Output WAV file path (defaults to <singer>_mashup.wav)
    #[arg(short, long, conflicts_with = "email")]
    pub output: Option<PathBuf>,

    /// Email the zipped mashup to this address instead of keeping it
    #[arg(short, long)]
    pub email: Option<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Serve the web form instead of building one mashup
    #[arg(long, conflicts_with_all = ["singer", "count", "duration", "output", "email"])]
    pub serve: bool,

    /// Port for the web form (defaults to MASHUP_PORT or 5000)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running the web form.
    pub fn is_serve_mode(&self) -> bool {
        self.serve
    }

    /// Returns true if building a single mashup.
    pub fn is_cli_mode(&self) -> bool {
        !self.serve && self.singer.is_some()
    }

    /// Returns the output path of the mashup.
    ///
    /// Email delivery writes next to the working directory under the
    /// singer-derived name, which is removed after sending.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from(mashup_file_name(self.singer.as_deref().unwrap_or_default())),
        }
    }

    /// Returns where the finished mashup goes.
    pub fn delivery_target(&self) -> DeliveryTarget {
        match &self.email {
            Some(address) => DeliveryTarget::Email(address.clone()),
            None => DeliveryTarget::File(self.output_path()),
        }
    }

    /// Builds the pipeline request from the parsed arguments.
    pub fn request(&self) -> Result<MashupRequest> {
        let singer = self
            .singer
            .as_deref()
            .ok_or_else(|| MashupError::invalid_input("--singer is required"))?;
        let count = self
            .count
            .ok_or_else(|| MashupError::invalid_input("--count is required"))?;
        let duration = self
            .duration
            .ok_or_else(|| MashupError::invalid_input("--duration is required"))?;
        Ok(MashupRequest::new(singer, count, duration, self.output_path()))
    }
}
