//! Startup and shutdown failures. Job ticks report through `anyhow` and never
//! reach this type.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result alias for the boot sequence.
pub type AppResult<T> = Result<T, AppError>;

/// Fatal error returned from [`crate::run_app`].
#[derive(Debug, Error)]
pub enum AppError {
    /// Loading `sweeparr.json` failed.
    #[error("failed to load configuration")]
    Config {
        /// Step that failed, e.g. `config.load`.
        operation: &'static str,
        /// Loader error.
        source: sweeparr_config::ConfigError,
    },
    /// Logging or metrics setup failed.
    #[error("failed to initialise telemetry")]
    Telemetry {
        /// Step that failed.
        operation: &'static str,
        /// Telemetry error.
        source: sweeparr_telemetry::TelemetryError,
    },
    /// A download client driver could not be built.
    #[error("download client setup failed")]
    Client {
        /// Configured client name.
        name: String,
        /// Driver error.
        source: sweeparr_clients::ClientError,
    },
    /// The arr transport could not be built.
    #[error("arr client setup failed")]
    Arr {
        /// Step that failed.
        operation: &'static str,
        /// Transport error.
        source: sweeparr_arr::ArrError,
    },
    /// The blocklist loader could not be built.
    #[error("blocklist loader setup failed")]
    Service {
        /// Step that failed.
        operation: &'static str,
        /// HTTP client error.
        source: sweeparr_service::ServiceError,
    },
    /// The health listener failed.
    #[error("health server failed")]
    Server {
        /// Step that failed.
        operation: &'static str,
        /// Configured `health_bind` address.
        addr: SocketAddr,
        /// OS error.
        source: io::Error,
    },
    /// A socket or signal call failed.
    #[error("system call failed")]
    Io {
        /// Step that failed.
        operation: &'static str,
        /// OS error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: sweeparr_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: sweeparr_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn arr(operation: &'static str, source: sweeparr_arr::ArrError) -> Self {
        Self::Arr { operation, source }
    }
}
