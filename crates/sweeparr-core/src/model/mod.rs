//! Download domain types shared by drivers, services, and jobs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Normalised lifecycle state of a download across all supported clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Waiting in the client queue.
    Queued,
    /// Verifying, allocating, or moving data.
    Checking,
    /// Resolving metadata (magnet links) before any payload transfer.
    FetchingMetadata,
    /// Actively downloading, including stalled transfers.
    Downloading,
    /// Completed and seeding.
    Seeding,
    /// Paused or stopped by the user.
    Paused,
    /// The client reported an error.
    Errored,
    /// The client state could not be mapped.
    Unknown,
}

impl DownloadState {
    /// Whether the download is in the active payload transfer state.
    #[must_use]
    pub const fn is_downloading(self) -> bool {
        matches!(self, Self::Downloading)
    }
}

/// Supported download client implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// qBittorrent Web API.
    #[serde(rename = "qbittorrent")]
    QBittorrent,
    /// Deluge Web UI JSON-RPC.
    Deluge,
    /// Transmission RPC.
    Transmission,
}

impl ClientKind {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QBittorrent => "qbittorrent",
            Self::Deluge => "deluge",
            Self::Transmission => "transmission",
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media manager flavour owning a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceType {
    /// Series manager.
    Sonarr,
    /// Movie manager.
    Radarr,
    /// Music manager.
    Lidarr,
}

impl InstanceType {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sonarr => "sonarr",
            Self::Radarr => "radarr",
            Self::Lidarr => "lidarr",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sonarr" => Ok(Self::Sonarr),
            "radarr" => Ok(Self::Radarr),
            "lidarr" => Ok(Self::Lidarr),
            _ => Err(CoreError::UnknownVariant {
                kind: "instance_type",
                value: value.to_string(),
            }),
        }
    }
}

/// Kind of bad condition a strike records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeType {
    /// Download is active but makes no progress.
    Stalled,
    /// Download is stuck resolving metadata.
    DownloadingMetadata,
    /// The arr failed to import the download.
    FailedImport,
    /// Download speed is below the configured minimum.
    SlowSpeed,
    /// Estimated remaining time is above the configured maximum.
    SlowTime,
}

impl StrikeType {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stalled => "stalled",
            Self::DownloadingMetadata => "downloading_metadata",
            Self::FailedImport => "failed_import",
            Self::SlowSpeed => "slow_speed",
            Self::SlowTime => "slow_time",
        }
    }
}

impl fmt::Display for StrikeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a queue item is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// No removal.
    #[default]
    None,
    /// Stalled strikes reached the limit.
    Stalled,
    /// Slow speed strikes reached the limit.
    SlowSpeed,
    /// Slow time strikes reached the limit.
    SlowTime,
    /// Failed import strikes reached the limit.
    FailedImport,
    /// Every file is marked as skipped.
    AllFilesSkipped,
    /// qBittorrent skipped every file at add time and nothing was downloaded.
    AllFilesSkippedByQBit,
    /// Every file matched the blocklist.
    AllFilesBlocked,
    /// Metadata download strikes reached the limit.
    DownloadingMetadata,
}

impl DeleteReason {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stalled => "stalled",
            Self::SlowSpeed => "slow_speed",
            Self::SlowTime => "slow_time",
            Self::FailedImport => "failed_import",
            Self::AllFilesSkipped => "all_files_skipped",
            Self::AllFilesSkippedByQBit => "all_files_skipped_by_qbit",
            Self::AllFilesBlocked => "all_files_blocked",
            Self::DownloadingMetadata => "downloading_metadata",
        }
    }
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StrikeType> for DeleteReason {
    fn from(value: StrikeType) -> Self {
        match value {
            StrikeType::Stalled => Self::Stalled,
            StrikeType::DownloadingMetadata => Self::DownloadingMetadata,
            StrikeType::FailedImport => Self::FailedImport,
            StrikeType::SlowSpeed => Self::SlowSpeed,
            StrikeType::SlowTime => Self::SlowTime,
        }
    }
}

/// Why a seeding download is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CleanReason {
    /// No clean.
    #[default]
    None,
    /// Share ratio reached the category maximum.
    MaxRatioReached,
    /// Seeding time reached the category maximum.
    MaxSeedTimeReached,
}

impl CleanReason {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::MaxRatioReached => "max_ratio_reached",
            Self::MaxSeedTimeReached => "max_seed_time_reached",
        }
    }
}

impl fmt::Display for CleanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a single download as reported by its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Lowercase info-hash.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Normalised state.
    pub state: DownloadState,
    /// Current download speed in bytes per second.
    pub download_speed: u64,
    /// Estimated remaining time; `None` when unknown or infinite.
    pub eta: Option<Duration>,
    /// Total wanted size in bytes.
    pub size: u64,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Accumulated seeding time.
    pub seeding_time: Duration,
    /// Share ratio.
    pub ratio: f64,
    /// Whether the torrent belongs to a private tracker.
    pub is_private: bool,
    /// Category or label.
    pub category: Option<String>,
    /// Tags or labels beyond the category.
    pub tags: Vec<String>,
    /// Storage directory.
    pub save_path: Option<String>,
    /// Tracker host names.
    pub trackers: Vec<String>,
    /// Completion timestamp when the client reports one.
    pub completed_on: Option<DateTime<Utc>>,
}

impl DownloadRecord {
    /// Minimal record used by drivers before filling in client fields.
    #[must_use]
    pub fn new(hash: impl Into<String>, name: impl Into<String>, state: DownloadState) -> Self {
        Self {
            hash: hash.into().to_ascii_lowercase(),
            name: name.into(),
            state,
            download_speed: 0,
            eta: None,
            size: 0,
            downloaded: 0,
            seeding_time: Duration::ZERO,
            ratio: 0.0,
            is_private: false,
            category: None,
            tags: Vec::new(),
            save_path: None,
            trackers: Vec::new(),
            completed_on: None,
        }
    }

    /// Category, or the empty string when unset.
    #[must_use]
    pub fn category_or_empty(&self) -> &str {
        self.category.as_deref().unwrap_or_default()
    }
}

/// File priority normalised across clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePriority {
    /// Not downloaded.
    Skip,
    /// Low priority.
    Low,
    /// Normal priority.
    Normal,
    /// High priority.
    High,
}

impl FilePriority {
    /// Whether the file is excluded from the download.
    #[must_use]
    pub const fn is_skipped(self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Single file entry inside a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFile {
    /// Client-side index.
    pub index: u32,
    /// Path relative to the download root.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Current priority.
    pub priority: FilePriority,
}

impl DownloadFile {
    /// File name without any directory components.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.name.as_str())
    }
}

/// Outcome of a queue removal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadCheckResult {
    /// Whether the client knows the download.
    pub found: bool,
    /// Whether the download is private.
    pub is_private: bool,
    /// Whether an ignore rule matched; no other check ran.
    pub ignored: bool,
    /// Whether the queue item should be removed.
    pub should_remove: bool,
    /// Cause of the removal.
    pub delete_reason: DeleteReason,
}

impl DownloadCheckResult {
    /// Result for a hash the client does not know.
    #[must_use]
    pub const fn not_found() -> Self {
        Self {
            found: false,
            is_private: false,
            ignored: false,
            should_remove: false,
            delete_reason: DeleteReason::None,
        }
    }

    /// Result for a known download that is kept.
    #[must_use]
    pub const fn keep(is_private: bool) -> Self {
        Self {
            found: true,
            is_private,
            ignored: false,
            should_remove: false,
            delete_reason: DeleteReason::None,
        }
    }

    /// Result for a known download matched by an ignore rule.
    #[must_use]
    pub const fn ignored(is_private: bool) -> Self {
        Self {
            ignored: true,
            ..Self::keep(is_private)
        }
    }

    /// Result for a known download that must be removed.
    #[must_use]
    pub const fn remove(is_private: bool, reason: DeleteReason) -> Self {
        Self {
            found: true,
            is_private,
            ignored: false,
            should_remove: true,
            delete_reason: reason,
        }
    }
}

/// Outcome of a content blocking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFilesResult {
    /// Whether the client knows the download.
    pub found: bool,
    /// Whether the download is private.
    pub is_private: bool,
    /// Whether every file is now unwanted.
    pub should_remove: bool,
    /// Number of files newly marked as unwanted.
    pub blocked: usize,
}

/// Outcome of the seeding decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedingCheckResult {
    /// Whether the download should be removed.
    pub should_clean: bool,
    /// Cause of the clean.
    pub reason: CleanReason,
}
