//! Typed configuration sections.
//!
//! Every section defaults field by field so a partial document is accepted;
//! validation happens separately in `validate.rs`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sweeparr_core::{ByteSize, ClientKind, InstanceType, SmartTimeSpan};
use url::Url;

const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 100;

const fn default_true() -> bool {
    true
}

const fn default_inherit() -> i32 {
    -1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Process-wide settings.
    pub general: GeneralConfig,
    /// Queue cleaner job.
    pub queue_cleaner: QueueCleanerConfig,
    /// Content blocker job.
    pub content_blocker: ContentBlockerConfig,
    /// Download cleaner job.
    pub download_cleaner: DownloadCleanerConfig,
    /// Download clients.
    pub download_clients: Vec<DownloadClientConfig>,
    /// Sonarr instances.
    pub sonarr: ArrConfig,
    /// Radarr instances.
    pub radarr: ArrConfig,
    /// Lidarr instances.
    pub lidarr: ArrConfig,
}

impl AppConfig {
    /// Arr section for an instance type.
    #[must_use]
    pub const fn arr(&self, instance_type: InstanceType) -> &ArrConfig {
        match instance_type {
            InstanceType::Sonarr => &self.sonarr,
            InstanceType::Radarr => &self.radarr,
            InstanceType::Lidarr => &self.lidarr,
        }
    }
}

/// Log output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatSetting {
    /// Pretty in debug builds, JSON in release builds.
    #[default]
    Auto,
    /// Human-readable output.
    Pretty,
    /// Structured JSON output.
    Json,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Suppress every mutating call.
    pub dry_run: bool,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout_secs: u64,
    /// Ignore rules (hash, category, tag, tracker, or name fragment).
    pub ignored_downloads: Vec<String>,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormatSetting,
    /// Bind address for the health and metrics endpoint.
    pub health_bind: Option<SocketAddr>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            ignored_downloads: Vec::new(),
            log_level: default_log_level(),
            log_format: LogFormatSetting::Auto,
            health_bind: None,
        }
    }
}

impl GeneralConfig {
    /// HTTP timeout as a duration.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Queue cleaner job settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueCleanerConfig {
    /// Whether the job is scheduled.
    pub enabled: bool,
    /// Tick interval in seconds.
    pub interval_secs: u64,
    /// Failed import policy.
    pub failed_import: FailedImportConfig,
    /// Stalled download policy.
    pub stalled: StalledConfig,
    /// Slow download policy.
    pub slow: SlowConfig,
}

impl Default for QueueCleanerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            failed_import: FailedImportConfig::default(),
            stalled: StalledConfig::default(),
            slow: SlowConfig::default(),
        }
    }
}

impl QueueCleanerConfig {
    /// Tick interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Failed import policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FailedImportConfig {
    /// Strikes before removal; zero disables.
    pub max_strikes: u32,
    /// Never strike private downloads.
    pub ignore_private: bool,
    /// Delete private download data on removal.
    pub delete_private: bool,
    /// Status message fragments that prevent a strike.
    pub ignored_patterns: Vec<String>,
}

/// Stalled download policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalledConfig {
    /// Strikes before removal; zero disables.
    pub max_strikes: u32,
    /// Accepted for parity with the slow policy; stalled strikes always reset on byte progress.
    pub reset_strikes_on_progress: bool,
    /// Never strike private downloads.
    pub ignore_private: bool,
    /// Delete private download data on removal.
    pub delete_private: bool,
    /// Strikes before removing downloads stuck on metadata; zero disables.
    pub downloading_metadata_max_strikes: u32,
}

impl Default for StalledConfig {
    fn default() -> Self {
        Self {
            max_strikes: 0,
            reset_strikes_on_progress: true,
            ignore_private: false,
            delete_private: false,
            downloading_metadata_max_strikes: 0,
        }
    }
}

/// Slow download policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowConfig {
    /// Strikes before removal; zero disables.
    pub max_strikes: u32,
    /// Reset strikes whenever a tick does not qualify.
    #[serde(default = "default_true")]
    pub reset_strikes_on_progress: bool,
    /// Never strike private downloads.
    pub ignore_private: bool,
    /// Delete private download data on removal.
    pub delete_private: bool,
    /// Minimum speed per second; zero disables the speed check.
    pub min_speed: ByteSize,
    /// Maximum estimated remaining time in hours; zero disables the time check.
    pub max_time_hours: f64,
    /// Downloads larger than this are never struck; zero means no limit.
    pub ignore_above_size: ByteSize,
}

impl Default for SlowConfig {
    fn default() -> Self {
        Self {
            max_strikes: 0,
            reset_strikes_on_progress: true,
            ignore_private: false,
            delete_private: false,
            min_speed: ByteSize::ZERO,
            max_time_hours: 0.0,
            ignore_above_size: ByteSize::ZERO,
        }
    }
}

impl SlowConfig {
    /// Maximum estimated remaining time.
    #[must_use]
    pub fn max_time(&self) -> SmartTimeSpan {
        SmartTimeSpan::from_hours(self.max_time_hours)
    }
}

/// Whether blocklist entries mark matches or non-matches as unwanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlocklistType {
    /// Files matching an entry are unwanted.
    #[default]
    Blacklist,
    /// Files matching no entry are unwanted.
    Whitelist,
}

/// Blocklist for one arr type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BlocklistSettings {
    /// Whether the content blocker handles this arr type.
    pub enabled: bool,
    /// Local file path or `http(s)` URL of the list.
    pub path: Option<String>,
    /// List semantics.
    pub blocklist_type: BlocklistType,
}

/// Content blocker job settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBlockerConfig {
    /// Whether the job is scheduled.
    pub enabled: bool,
    /// Tick interval in seconds.
    pub interval_secs: u64,
    /// Never block files of private downloads.
    pub ignore_private: bool,
    /// Delete private download data when every file is blocked.
    pub delete_private: bool,
    /// Sonarr blocklist.
    pub sonarr: BlocklistSettings,
    /// Radarr blocklist.
    pub radarr: BlocklistSettings,
    /// Lidarr blocklist.
    pub lidarr: BlocklistSettings,
}

impl Default for ContentBlockerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            ignore_private: false,
            delete_private: false,
            sonarr: BlocklistSettings::default(),
            radarr: BlocklistSettings::default(),
            lidarr: BlocklistSettings::default(),
        }
    }
}

impl ContentBlockerConfig {
    /// Tick interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Blocklist for an arr type.
    #[must_use]
    pub const fn blocklist(&self, instance_type: InstanceType) -> &BlocklistSettings {
        match instance_type {
            InstanceType::Sonarr => &self.sonarr,
            InstanceType::Radarr => &self.radarr,
            InstanceType::Lidarr => &self.lidarr,
        }
    }
}

/// Seeding cleanup rule for one category.
///
/// `max_ratio` and `max_seed_time` are negative when disabled and zero for
/// "clean immediately". Times are in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanCategory {
    /// Category name.
    pub name: String,
    /// Ratio threshold.
    pub max_ratio: f64,
    /// Minimum seeding time before the ratio rule applies.
    #[serde(default)]
    pub min_seed_time: f64,
    /// Seeding time threshold.
    pub max_seed_time: f64,
}

/// Handling for downloads that have no hardlinks left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UnlinkedConfig {
    /// Whether unlinked downloads are reassigned.
    pub enabled: bool,
    /// Category (or tag) applied to unlinked downloads.
    pub target_category: String,
    /// Apply a tag instead of changing the category.
    pub use_tag: bool,
    /// Root whose hardlinks do not count.
    pub ignored_root_dir: Option<PathBuf>,
    /// Source categories inspected.
    pub categories: Vec<String>,
}

/// Download cleaner job settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadCleanerConfig {
    /// Whether the job is scheduled.
    pub enabled: bool,
    /// Tick interval in seconds.
    pub interval_secs: u64,
    /// Clean private downloads as well.
    pub delete_private: bool,
    /// Category rules.
    pub categories: Vec<CleanCategory>,
    /// Unlinked download handling.
    pub unlinked: UnlinkedConfig,
}

impl Default for DownloadCleanerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            delete_private: false,
            categories: Vec::new(),
            unlinked: UnlinkedConfig::default(),
        }
    }
}

impl DownloadCleanerConfig {
    /// Tick interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Connection settings for one download client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadClientConfig {
    /// Unique name.
    pub name: String,
    /// Client implementation.
    #[serde(rename = "type")]
    pub kind: ClientKind,
    /// Whether the client is used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the client.
    #[serde(default)]
    pub host: Option<Url>,
    /// Username, when the client requires one.
    #[serde(default)]
    pub username: Option<String>,
    /// Password, when the client requires one.
    #[serde(default)]
    pub password: Option<String>,
    /// Path prefix appended to the host.
    #[serde(default)]
    pub url_base: Option<String>,
}

/// Target granularity of Sonarr re-searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Search the affected episodes.
    #[default]
    Episode,
    /// Search the affected seasons.
    Season,
    /// Search the whole series.
    Series,
}

/// One arr instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrInstanceConfig {
    /// Unique name.
    pub name: String,
    /// Base URL.
    pub url: Url,
    /// API key sent as `x-api-key`.
    pub api_key: String,
}

/// Settings shared by every instance of one arr type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrConfig {
    /// `-1` inherits the queue cleaner value, `0` disables, positive overrides.
    #[serde(default = "default_inherit")]
    pub failed_import_max_strikes: i32,
    /// Re-search granularity (Sonarr only).
    pub search_type: SearchType,
    /// Instances.
    pub instances: Vec<ArrInstanceConfig>,
}

impl Default for ArrConfig {
    fn default() -> Self {
        Self {
            failed_import_max_strikes: -1,
            search_type: SearchType::Episode,
            instances: Vec::new(),
        }
    }
}

impl ArrConfig {
    /// Failed import maximum after applying the per-arr override.
    #[must_use]
    pub fn effective_failed_import_max_strikes(&self, inherited: u32) -> u32 {
        if self.failed_import_max_strikes < 0 {
            inherited
        } else {
            u32::try_from(self.failed_import_max_strikes).unwrap_or(inherited)
        }
    }
}
