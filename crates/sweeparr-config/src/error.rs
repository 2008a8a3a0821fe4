//! Errors raised while loading or validating `sweeparr.json`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a configuration document was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file")]
    Io {
        /// Configuration file path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The document is not JSON or does not match the settings model.
    #[error("failed to parse configuration document")]
    Parse {
        /// File path, absent for in-memory documents.
        path: Option<PathBuf>,
        /// Deserializer error with line and column.
        #[source]
        source: serde_json::Error,
    },
    /// A setting parsed but breaks a validation rule.
    #[error("invalid configuration field")]
    InvalidField {
        /// Top-level section, e.g. `queue_cleaner` or `sonarr`.
        section: String,
        /// Setting within the section.
        field: String,
        /// Rejected value, if it is safe to echo.
        value: Option<String>,
        /// Rule that was broken, e.g. `must be greater than zero`.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: impl Into<String>,
        field: impl Into<String>,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            field: field.into(),
            value,
            reason,
        }
    }
}
