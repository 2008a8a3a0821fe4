#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]

//! Binary entrypoint that wires the Sweeparr jobs together and runs them
//! until shutdown.

use clap::Parser;
use sweeparr_app::{AppResult, Cli, run_app};

/// Parses the command line and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app(Cli::parse()).await
}
