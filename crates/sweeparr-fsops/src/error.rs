//! Errors raised while inspecting download directories.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for hardlink inspection.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Failure while inspecting a download's files.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// Reading metadata for a single path failed.
    #[error("failed to read file metadata")]
    Io {
        /// Step that failed, e.g. `hardlinks.metadata`.
        operation: &'static str,
        /// File or directory being inspected.
        path: PathBuf,
        /// OS error.
        source: io::Error,
    },
    /// Walking a download directory failed part way.
    #[error("failed to walk download directory")]
    Walkdir {
        /// Step that failed.
        operation: &'static str,
        /// Directory root of the walk.
        path: PathBuf,
        /// Walk error, including the entry that broke it.
        source: walkdir::Error,
    },
    /// The platform does not expose hardlink counts.
    #[error("hardlink counts unavailable on this platform")]
    Unsupported {
        /// Step that needed the link count.
        operation: &'static str,
    },
}
