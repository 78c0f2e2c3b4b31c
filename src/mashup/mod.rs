//! Mashup construction: trim acquired tracks, compose them, and orchestrate
//! the whole run.

pub mod compose;
pub mod pipeline;
pub mod trim;

#[cfg(test)]
pub(crate) mod testing;

pub use compose::{ComposeError, ComposeSummary, Composer};
pub use pipeline::{CancelToken, Pipeline, Workspace};
pub use trim::{BoundedClip, Trimmed, Trimmer};
