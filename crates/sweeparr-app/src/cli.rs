//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use sweeparr_config::DEFAULT_CONFIG_PATH;

/// Sweeparr command line.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sweeparr",
    version,
    about = "Cleans arr download queues and the download clients behind them"
)]
pub struct Cli {
    /// Configuration document.
    #[arg(long, env = "SWEEPARR_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Force dry run regardless of the configuration.
    #[arg(long)]
    pub dry_run: bool,
    /// Run every enabled job once and exit.
    #[arg(long)]
    pub once: bool,
    /// Log level used when `RUST_LOG` is unset; overrides `general.log_level`.
    #[arg(long, env = "SWEEPARR_LOG_LEVEL")]
    pub log_level: Option<String>,
}
