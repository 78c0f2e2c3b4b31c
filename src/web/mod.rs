//! Web form invocation surface.
//!
//! - `GET /`: the mashup form
//! - `POST /`: build a mashup for `singer, videos, duration` and email it

pub mod form;
pub mod server;

pub use form::MashupForm;
pub use server::{make_app, run_server, ServerState};
