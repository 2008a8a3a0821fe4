//! Events published by the cleanup jobs and the health monitor.

use chrono::{DateTime, Utc};

/// Sequence number assigned by the bus, starting at 1.
pub type EventId = u64;

/// Envelopes retained for `backlog_since` by [`crate::EventBus::new`].
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Something a job did, or a change in client health.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A download or queue item received a strike.
    StrikeIssued {
        /// Download hash or arr download id the strike is keyed on.
        hash: String,
        /// Display name of the struck item.
        name: String,
        /// Strike type label (`stalled`, `slow_speed`, ...).
        strike_type: String,
        /// Strike count after the increment.
        strikes: u32,
    },
    /// An arr queue item was deleted (and optionally removed from its client).
    QueueItemDeleted {
        /// Arr instance name.
        instance: String,
        /// Queue item title.
        title: String,
        /// Download id of the queue item.
        download_id: String,
        /// Delete reason label.
        reason: String,
        /// Whether the download client was asked to delete the data as well.
        removed_from_client: bool,
    },
    /// Unwanted files of a download were marked as skipped.
    FilesBlocked {
        /// Download hash.
        hash: String,
        /// Download name.
        name: String,
        /// Number of files newly marked as unwanted.
        blocked: usize,
    },
    /// A seeding download was removed by the download cleaner.
    DownloadCleaned {
        /// Download hash.
        hash: String,
        /// Download name.
        name: String,
        /// Share ratio at the time of removal.
        ratio: f64,
        /// Seeding time in seconds at the time of removal.
        seeding_time_secs: u64,
        /// Category the download matched.
        category: String,
        /// Clean reason label.
        reason: String,
    },
    /// A download without hardlinks was moved to the unlinked category or tagged.
    CategoryChanged {
        /// Download hash.
        hash: String,
        /// Download name.
        name: String,
        /// Category before the change.
        old_category: String,
        /// Category (or tag) applied.
        new_category: String,
        /// Whether a tag was used instead of a category.
        used_tag: bool,
    },
    /// A re-search command was sent to an arr instance.
    SearchTriggered {
        /// Arr instance name.
        instance: String,
        /// Number of search targets included in the command(s).
        items: usize,
    },
    /// Download client health changed (degraded or restored clients).
    HealthChanged {
        /// Clients currently considered degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Snake-case name matching the serialized `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StrikeIssued { .. } => "strike_issued",
            Self::QueueItemDeleted { .. } => "queue_item_deleted",
            Self::FilesBlocked { .. } => "files_blocked",
            Self::DownloadCleaned { .. } => "download_cleaned",
            Self::CategoryChanged { .. } => "category_changed",
            Self::SearchTriggered { .. } => "search_triggered",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// An [`Event`] stamped by the bus.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Bus sequence number.
    pub id: EventId,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
    /// Payload.
    pub event: Event,
}
