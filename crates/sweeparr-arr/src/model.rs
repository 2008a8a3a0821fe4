//! Queue payloads and search targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of an arr queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueListResponse {
    /// Page number, starting at one.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Total records across every page.
    pub total_records: u64,
    /// Records on this page.
    pub records: Vec<QueueRecord>,
}

/// Status message attached to a queue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StatusMessage {
    /// Message title, usually a file name.
    pub title: String,
    /// Message lines.
    pub messages: Vec<String>,
}

/// Arr queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueRecord {
    /// Queue item id.
    pub id: u64,
    /// Release title.
    pub title: String,
    /// Queue status (`downloading`, `completed`, `failed`, ...).
    pub status: String,
    /// Tracked download status (`ok`, `warning`, `error`).
    pub tracked_download_status: String,
    /// Tracked download state (`downloading`, `importPending`, ...).
    pub tracked_download_state: String,
    /// Status messages.
    pub status_messages: Vec<StatusMessage>,
    /// Download client id; the torrent hash for torrent clients.
    pub download_id: String,
    /// `torrent` or `usenet`.
    pub protocol: String,
    /// Sonarr series id.
    pub series_id: Option<u64>,
    /// Sonarr episode id.
    pub episode_id: Option<u64>,
    /// Sonarr season number.
    pub season_number: Option<i64>,
    /// Radarr movie id.
    pub movie_id: Option<u64>,
    /// Lidarr artist id.
    pub artist_id: Option<u64>,
    /// Lidarr album id.
    pub album_id: Option<u64>,
    /// Time the item entered the queue.
    pub added: Option<DateTime<Utc>>,
}

impl QueueRecord {
    /// Lowercase download id, or `None` when it is blank.
    #[must_use]
    pub fn download_hash(&self) -> Option<String> {
        let id = self.download_id.trim();
        (!id.is_empty()).then(|| id.to_ascii_lowercase())
    }

    /// Whether the record was downloaded over a torrent client.
    #[must_use]
    pub fn is_torrent(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("torrent")
    }

    /// Whether any status message title or line contains `pattern`, ignoring case.
    #[must_use]
    pub fn status_mentions(&self, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        self.status_messages.iter().any(|message| {
            message.title.to_lowercase().contains(&pattern)
                || message
                    .messages
                    .iter()
                    .any(|line| line.to_lowercase().contains(&pattern))
        })
    }
}

/// Target of a re-search command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SearchItem {
    /// Sonarr episode.
    Episode {
        /// Episode id.
        id: u64,
    },
    /// Sonarr season.
    Season {
        /// Series id.
        series_id: u64,
        /// Season number.
        season_number: i64,
    },
    /// Sonarr series.
    Series {
        /// Series id.
        series_id: u64,
    },
    /// Radarr movie.
    Movie {
        /// Movie id.
        id: u64,
    },
    /// Lidarr album.
    Album {
        /// Album id.
        id: u64,
    },
}
