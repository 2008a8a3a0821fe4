#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Client-agnostic download domain types and the driver interface.
//!
//! Layout: `model/` (records, states, reasons, check results), `units.rs`
//! (`ByteSize`, `SmartTimeSpan`), `striker.rs` (TTL strike counter),
//! `dry_run.rs` (mutation interceptor), `service/` (`DownloadClient` trait).

pub mod dry_run;
pub mod error;
pub mod model;
pub mod service;
pub mod striker;
pub mod units;

pub use dry_run::DryRun;
pub use error::{CoreError, CoreResult};
pub use model::{
    BlockFilesResult, CleanReason, ClientKind, DeleteReason, DownloadCheckResult, DownloadFile,
    DownloadRecord, DownloadState, FilePriority, InstanceType, SeedingCheckResult, StrikeType,
};
pub use service::DownloadClient;
pub use striker::{MAX_STRIKE_TTL, STRIKE_TTL_BUFFER, Striker};
pub use units::{ByteSize, SmartTimeSpan};
