#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! File-backed configuration for the cleanup jobs.
//!
//! Layout: `model.rs` (typed sections), `validate.rs` (document validation),
//! `loader.rs` (JSON parsing), `service.rs` (`ConfigService` snapshots).

pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{DEFAULT_CONFIG_PATH, load_config, parse_config};
pub use model::{
    AppConfig, ArrConfig, ArrInstanceConfig, BlocklistSettings, BlocklistType, CleanCategory,
    ContentBlockerConfig, DownloadCleanerConfig, DownloadClientConfig, FailedImportConfig,
    GeneralConfig, LogFormatSetting, QueueCleanerConfig, SearchType, SlowConfig, StalledConfig,
    UnlinkedConfig,
};
pub use service::ConfigService;
pub use validate::validate_config;
