#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Per-client evaluation facade shared by the cleaning jobs.
//!
//! Layout: `service/` (`DownloadService`: queue evaluation, content blocking,
//! seeding cleanup, unlinked category changes), `ignore.rs` (ignored
//! downloads), `blocklist.rs` (file name blocklists and their loader).

pub mod blocklist;
pub mod error;
pub mod ignore;
pub mod service;

#[cfg(test)]
mod testing;

pub use blocklist::{Blocklist, BlocklistProvider};
pub use error::{ServiceError, ServiceResult};
pub use ignore::IgnoreRules;
pub use service::{DownloadService, seeding_check};
