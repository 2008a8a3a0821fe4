#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Sweeparr application wiring.
//!
//! Layout: `cli.rs` (arguments), `bootstrap.rs` (service wiring and process
//! lifecycle), `jobs/` (queue cleaner, content blocker, download cleaner),
//! `scheduler.rs` (interval loops), `health.rs` (client probes and the
//! `/health` + `/metrics` listener).

pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod health;
pub mod jobs;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use bootstrap::run_app;
pub use cli::Cli;
pub use error::{AppError, AppResult};
