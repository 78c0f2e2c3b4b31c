//! Track acquisition module.
//!
//! Searches a content source and fetches the hits into a working directory.

pub mod acquirer;
pub mod source;
pub mod ytdlp;

// Re-export commonly used items
pub use acquirer::{clear_dir, Acquirer, Acquisition};
pub use source::{ContentSource, SearchHit};
pub use ytdlp::YtDlpSource;
