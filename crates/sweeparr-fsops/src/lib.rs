//! Filesystem inspection used by the unlinked download handling.
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod hardlinks;

pub use error::{FsOpsError, FsOpsResult};
pub use hardlinks::HardLinkInspector;
