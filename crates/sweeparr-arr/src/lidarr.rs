//! Lidarr client.
//!
//! Lidarr reports some broken imports as `failed` or `completed` records
//! with a warning status instead of an import state.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sweeparr_config::ArrInstanceConfig;
use sweeparr_core::InstanceType;
use tracing::{debug, info};

use crate::api::ArrApi;
use crate::client::{ArrClient, send_search_command};
use crate::model::{QueueRecord, SearchItem};

/// Lidarr `/api/v1` client.
#[derive(Debug, Clone)]
pub struct LidarrClient {
    api: ArrApi,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    title: String,
}

impl LidarrClient {
    /// Wrap the transport.
    #[must_use]
    pub const fn new(api: ArrApi) -> Self {
        Self { api }
    }

    async fn album_titles(&self, instance: &ArrInstanceConfig, ids: &[u64]) -> Vec<String> {
        let url = ArrApi::url(instance, self.api_version(), "album");
        let query: Vec<_> = ids.iter().map(|id| ("albumIds", id.to_string())).collect();
        match self
            .api
            .get_json::<Vec<Album>>("lidarr.album", instance, &url, &query)
            .await
        {
            Ok(albums) => albums.into_iter().map(|album| album.title).collect(),
            Err(err) => {
                debug!(instance = %instance.name, error = %err, "album lookup failed");
                ids.iter().map(|id| format!("album {id}")).collect()
            }
        }
    }
}

#[async_trait]
impl ArrClient for LidarrClient {
    fn instance_type(&self) -> InstanceType {
        InstanceType::Lidarr
    }

    fn api(&self) -> &ArrApi {
        &self.api
    }

    fn api_version(&self) -> &'static str {
        "v1"
    }

    fn queue_includes(&self) -> &'static [&'static str] {
        &["includeUnknownArtistItems", "includeArtist", "includeAlbum"]
    }

    fn is_record_valid(&self, record: &QueueRecord) -> bool {
        record.download_hash().is_some() && record.artist_id.is_some() && record.album_id.is_some()
    }

    fn is_failed_import(&self, record: &QueueRecord) -> bool {
        let warning = record.tracked_download_status.eq_ignore_ascii_case("warning");
        let import_state = matches!(
            record.tracked_download_state.to_ascii_lowercase().as_str(),
            "importblocked" | "importpending" | "importfailed"
        );
        let finished = record.status.eq_ignore_ascii_case("failed")
            || record.status.eq_ignore_ascii_case("completed");
        warning && (import_state || finished)
    }

    fn search_target(&self, record: &QueueRecord) -> Option<SearchItem> {
        record.album_id.map(|id| SearchItem::Album { id })
    }

    async fn search_items(
        &self,
        instance: &ArrInstanceConfig,
        items: &[SearchItem],
    ) -> anyhow::Result<()> {
        let ids: Vec<u64> = items
            .iter()
            .filter_map(|item| match item {
                SearchItem::Album { id } => Some(*id),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        let titles = self.album_titles(instance, &ids).await;
        info!(instance = %instance.name, albums = ?titles, "searching albums");
        send_search_command(
            self,
            instance,
            json!({ "name": "AlbumSearch", "albumIds": ids }),
            ids.len(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use httpmock::prelude::*;
    use sweeparr_core::{DryRun, Striker};
    use sweeparr_events::EventBus;

    use super::*;

    fn client() -> anyhow::Result<LidarrClient> {
        Ok(LidarrClient::new(ArrApi::new(
            Duration::from_secs(5),
            Arc::new(Striker::new(Duration::from_secs(60))),
            DryRun::disabled(),
            EventBus::new(),
        )?))
    }

    #[test]
    fn completed_with_warning_is_a_failed_import() -> anyhow::Result<()> {
        let client = client()?;
        let record = QueueRecord {
            status: "completed".to_string(),
            tracked_download_status: "warning".to_string(),
            tracked_download_state: "downloading".to_string(),
            ..QueueRecord::default()
        };
        assert!(client.is_failed_import(&record));
        assert!(!client.is_failed_import(&QueueRecord {
            tracked_download_status: "ok".to_string(),
            ..record
        }));
        Ok(())
    }

    #[tokio::test]
    async fn queue_and_search_use_v1() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let queue = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/queue")
                .query_param("includeAlbum", "true");
            then.status(200)
                .json_body(json!({ "page": 1, "totalRecords": 0, "records": [] }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/album");
            then.status(200).json_body(json!([{ "title": "Album" }]));
        });
        let command = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/command")
                .json_body(json!({ "name": "AlbumSearch", "albumIds": [5] }));
            then.status(201);
        });
        let instance = ArrInstanceConfig {
            name: "lidarr".to_string(),
            url: server.base_url().parse()?,
            api_key: "secret".to_string(),
        };
        let client = client()?;
        assert!(client.get_queue_items(&instance, 1).await?.records.is_empty());
        client
            .search_items(&instance, &[SearchItem::Album { id: 5 }, SearchItem::Album { id: 5 }])
            .await?;
        queue.assert();
        command.assert();
        Ok(())
    }
}
