//! Error types for arr API calls.

use thiserror::Error;

/// Primary error type for arr operations.
#[derive(Debug, Error)]
pub enum ArrError {
    /// Building the HTTP client failed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or the response not received.
    #[error("arr request failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The arr answered with a non-success status.
    #[error("unexpected arr status")]
    HttpStatus {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Response status code.
        status: u16,
    },
    /// The response body could not be decoded.
    #[error("failed to decode arr response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}
