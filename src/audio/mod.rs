//! Audio I/O module.
//!
//! Decoding of acquired tracks, conversion to the mashup format, and WAV output.

pub mod convert;
pub mod decoder;
pub mod wav;

// Re-export commonly used items
pub use convert::{conform, TargetFormat};
pub use decoder::{AudioDecoder, AudioStream, SymphoniaDecoder};
pub use wav::{frames_to_duration, WavSink};
