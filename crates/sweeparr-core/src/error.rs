//! Error types for core value parsing.

use thiserror::Error;

/// Primary error type for core value types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A byte size string could not be parsed.
    #[error("invalid byte size")]
    InvalidByteSize {
        /// Raw input value.
        value: String,
    },
    /// A duration string could not be parsed.
    #[error("invalid duration")]
    InvalidDuration {
        /// Raw input value.
        value: String,
    },
    /// A name did not map onto a known variant.
    #[error("unknown variant")]
    UnknownVariant {
        /// Kind of value being parsed.
        kind: &'static str,
        /// Raw input value.
        value: String,
    },
}

/// Convenience alias for core parsing results.
pub type CoreResult<T> = Result<T, CoreError>;
