//! Error types for download client drivers.

use std::error::Error;

use thiserror::Error;

/// Primary error type for download client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Building the HTTP client failed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The configured host is missing or unusable.
    #[error("invalid client url")]
    InvalidUrl {
        /// Client name.
        client: String,
    },
    /// The request could not be sent or the response not received.
    #[error("http request failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The client answered with a non-success status.
    #[error("unexpected http status")]
    HttpStatus {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Response status code.
        status: u16,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying decode failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The RPC layer reported an error.
    #[error("rpc call failed")]
    Rpc {
        /// RPC method.
        method: String,
        /// Error code when provided.
        code: Option<i64>,
        /// Error message returned by the client.
        message: String,
    },
    /// The response id does not match the request id.
    #[error("rpc request id desync")]
    Desync {
        /// RPC method.
        method: String,
        /// Id sent with the request.
        expected: u64,
        /// Id carried by the response.
        received: Option<u64>,
    },
    /// Deluge Web is bound to more than one daemon.
    #[error("multiple deluge hosts found")]
    MultipleHosts {
        /// Number of hosts reported.
        count: usize,
    },
    /// Transmission answered 409 without a session id header.
    #[error("transmission session id missing")]
    MissingSessionId,
    /// Authentication was rejected.
    #[error("authentication failed")]
    Auth {
        /// Client name.
        client: String,
    },
}

impl ClientError {
    pub(crate) fn decode(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Decode {
            operation,
            source: source.into(),
        }
    }
}
