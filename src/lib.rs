//! HeartChat: emotion-steered two-stage chat.
//!
//! Every user message goes through two generation calls. The analysis stage
//! emits a tagged directive bundle (sampling parameters, emotion weights and a
//! steering prompt); the reply stage is then shaped by those directives.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;

pub mod directive;
pub mod prompt;
pub mod session;
