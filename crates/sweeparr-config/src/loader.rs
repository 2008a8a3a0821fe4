//! JSON document loading.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;
use crate::validate::validate_config;

/// Location used when neither `--config` nor `SWEEPARR_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/sweeparr.json";

/// Parse and validate a configuration document held in memory.
///
/// # Errors
///
/// Returns `ConfigError::Parse` for malformed JSON and
/// `ConfigError::InvalidField` for documents failing validation.
pub fn parse_config(raw: &str) -> ConfigResult<AppConfig> {
    let config: AppConfig =
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })?;
    validate_config(&config)?;
    Ok(config)
}

/// Read, parse, and validate the configuration file at `path`.
///
/// # Errors
///
/// Returns `ConfigError::Io` when the file cannot be read, otherwise the
/// errors of [`parse_config`].
pub fn load_config(path: &Path) -> ConfigResult<AppConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw).map_err(|err| match err {
        ConfigError::Parse { path: None, source } => ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    })
}
