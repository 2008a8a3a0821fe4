//! Error types for blocklist loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for service helpers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures raised while preparing evaluation inputs.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Building the HTTP client failed.
    #[error("failed to build http client")]
    HttpClient {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// A local blocklist could not be read.
    #[error("failed to read blocklist")]
    BlocklistRead {
        /// Blocklist path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A remote blocklist could not be fetched.
    #[error("failed to fetch blocklist")]
    BlocklistFetch {
        /// Blocklist URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// A remote blocklist answered with a non-success status.
    #[error("unexpected blocklist status")]
    BlocklistStatus {
        /// Blocklist URL.
        url: String,
        /// Response status code.
        status: u16,
    },
    /// A `regex:` entry failed to compile.
    #[error("invalid blocklist regex")]
    InvalidRegex {
        /// Offending pattern.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// A glob entry failed to compile.
    #[error("invalid blocklist pattern")]
    InvalidGlob {
        /// Offending pattern.
        pattern: String,
        /// Underlying globset error.
        #[source]
        source: globset::Error,
    },
}
