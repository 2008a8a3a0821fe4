//! Error types for logging and metrics setup.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured log level is not a valid filter directive.
    #[error("invalid log filter")]
    InvalidFilter {
        /// Directive as configured.
        directive: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector could not be created or registered.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Collector name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// Text exposition encoding failed.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// Encoded metrics were not UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}
