//! Sonarr client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sweeparr_config::{ArrInstanceConfig, SearchType};
use sweeparr_core::InstanceType;
use tracing::{debug, info};

use crate::api::ArrApi;
use crate::client::{ArrClient, send_search_command};
use crate::model::{QueueRecord, SearchItem};

/// Sonarr `/api/v3` client.
#[derive(Debug, Clone)]
pub struct SonarrClient {
    api: ArrApi,
    search_type: SearchType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Episode {
    #[serde(default)]
    title: String,
    #[serde(default)]
    season_number: i64,
    #[serde(default)]
    episode_number: i64,
}

impl SonarrClient {
    /// Wrap the transport; `search_type` picks the re-search granularity.
    #[must_use]
    pub const fn new(api: ArrApi, search_type: SearchType) -> Self {
        Self { api, search_type }
    }

    async fn episode_titles(&self, instance: &ArrInstanceConfig, ids: &[u64]) -> Vec<String> {
        let url = ArrApi::url(instance, self.api_version(), "episode");
        let query: Vec<_> = ids.iter().map(|id| ("episodeIds", id.to_string())).collect();
        match self
            .api
            .get_json::<Vec<Episode>>("sonarr.episode", instance, &url, &query)
            .await
        {
            Ok(episodes) => episodes
                .into_iter()
                .map(|e| format!("S{:02}E{:02} {}", e.season_number, e.episode_number, e.title))
                .collect(),
            Err(err) => {
                debug!(instance = %instance.name, error = %err, "episode lookup failed");
                ids.iter().map(|id| format!("episode {id}")).collect()
            }
        }
    }
}

#[async_trait]
impl ArrClient for SonarrClient {
    fn instance_type(&self) -> InstanceType {
        InstanceType::Sonarr
    }

    fn api(&self) -> &ArrApi {
        &self.api
    }

    fn queue_includes(&self) -> &'static [&'static str] {
        &["includeUnknownSeriesItems", "includeSeries", "includeEpisode"]
    }

    fn is_record_valid(&self, record: &QueueRecord) -> bool {
        record.download_hash().is_some()
            && record.episode_id.is_some()
            && record.series_id.is_some()
    }

    fn search_target(&self, record: &QueueRecord) -> Option<SearchItem> {
        match self.search_type {
            SearchType::Episode => record.episode_id.map(|id| SearchItem::Episode { id }),
            SearchType::Season => record
                .series_id
                .zip(record.season_number)
                .map(|(series_id, season_number)| SearchItem::Season {
                    series_id,
                    season_number,
                }),
            SearchType::Series => record
                .series_id
                .map(|series_id| SearchItem::Series { series_id }),
        }
    }

    async fn search_items(
        &self,
        instance: &ArrInstanceConfig,
        items: &[SearchItem],
    ) -> anyhow::Result<()> {
        let unique: BTreeSet<SearchItem> = items.iter().copied().collect();
        let episodes: Vec<u64> = unique
            .iter()
            .filter_map(|item| match item {
                SearchItem::Episode { id } => Some(*id),
                _ => None,
            })
            .collect();

        if !episodes.is_empty() {
            let titles = self.episode_titles(instance, &episodes).await;
            info!(instance = %instance.name, episodes = ?titles, "searching episodes");
            send_search_command(
                self,
                instance,
                json!({ "name": "EpisodeSearch", "episodeIds": episodes }),
                episodes.len(),
            )
            .await?;
        }
        for item in &unique {
            let body = match item {
                SearchItem::Season {
                    series_id,
                    season_number,
                } => json!({
                    "name": "SeasonSearch",
                    "seriesId": series_id,
                    "seasonNumber": season_number
                }),
                SearchItem::Series { series_id } => {
                    json!({ "name": "SeriesSearch", "seriesId": series_id })
                }
                _ => continue,
            };
            info!(instance = %instance.name, ?item, "searching");
            send_search_command(self, instance, body, 1).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use httpmock::prelude::*;
    use sweeparr_config::FailedImportConfig;
    use sweeparr_core::{DeleteReason, DryRun, StrikeType, Striker};
    use sweeparr_events::EventBus;

    use super::*;
    use crate::model::StatusMessage;

    fn instance(server: &MockServer) -> anyhow::Result<ArrInstanceConfig> {
        Ok(ArrInstanceConfig {
            name: "sonarr".to_string(),
            url: server.base_url().parse()?,
            api_key: "secret".to_string(),
        })
    }

    fn client(dry_run: bool, search_type: SearchType) -> anyhow::Result<SonarrClient> {
        let api = ArrApi::new(
            Duration::from_secs(5),
            Arc::new(Striker::new(Duration::from_secs(3_600))),
            DryRun::new(dry_run),
            EventBus::new(),
        )?;
        Ok(SonarrClient::new(api, search_type))
    }

    fn failed_import(download_id: &str) -> QueueRecord {
        QueueRecord {
            id: 7,
            title: "Show.S01E01".to_string(),
            tracked_download_status: "warning".to_string(),
            tracked_download_state: "importPending".to_string(),
            status_messages: vec![StatusMessage {
                title: "Show.S01E01.mkv".to_string(),
                messages: vec!["No files found are eligible for import".to_string()],
            }],
            download_id: download_id.to_string(),
            protocol: "torrent".to_string(),
            series_id: Some(3),
            episode_id: Some(11),
            season_number: Some(1),
            ..QueueRecord::default()
        }
    }

    #[tokio::test]
    async fn queue_request_carries_key_and_includes() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let queue = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/queue")
                .header("x-api-key", "secret")
                .query_param("page", "2")
                .query_param("pageSize", "200")
                .query_param("includeEpisode", "true");
            then.status(200).json_body(serde_json::json!({
                "page": 2,
                "pageSize": 200,
                "totalRecords": 201,
                "records": [{ "id": 9, "title": "Show", "downloadId": "ABC" }]
            }));
        });
        let page = client(false, SearchType::Episode)?
            .get_queue_items(&instance(&server)?, 2)
            .await?;
        queue.assert();
        assert_eq!(page.total_records, 201);
        assert_eq!(page.records[0].id, 9);
        Ok(())
    }

    #[tokio::test]
    async fn delete_sends_blocklist_flags() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let delete = server.mock(|when, then| {
            when.method(DELETE)
                .path("/api/v3/queue/7")
                .query_param("removeFromClient", "false")
                .query_param("blocklist", "true")
                .query_param("skipRedownload", "true")
                .query_param("changeCategory", "false");
            then.status(200);
        });
        let client = client(false, SearchType::Episode)?;
        client
            .delete_queue_item(
                &instance(&server)?,
                &failed_import("abc"),
                false,
                DeleteReason::FailedImport,
            )
            .await?;
        delete.assert();
        let events = client.api().events().backlog_since(0);
        assert_eq!(events.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_skips_delete_request() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let client = client(true, SearchType::Episode)?;
        client
            .delete_queue_item(
                &instance(&server)?,
                &failed_import("abc"),
                true,
                DeleteReason::Stalled,
            )
            .await?;
        assert_eq!(client.api().events().backlog_since(0).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn episodes_are_batched_and_seasons_sent_separately() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let episodes = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v3/command")
                .json_body(serde_json::json!({ "name": "EpisodeSearch", "episodeIds": [11, 12] }));
            then.status(201);
        });
        let season = server.mock(|when, then| {
            when.method(POST).path("/api/v3/command").json_body(serde_json::json!({
                "name": "SeasonSearch",
                "seriesId": 3,
                "seasonNumber": 2
            }));
            then.status(201);
        });
        let lookup = server.mock(|when, then| {
            when.method(GET).path("/api/v3/episode");
            then.status(500);
        });
        client(false, SearchType::Episode)?
            .search_items(
                &instance(&server)?,
                &[
                    SearchItem::Episode { id: 12 },
                    SearchItem::Episode { id: 11 },
                    SearchItem::Episode { id: 12 },
                    SearchItem::Season {
                        series_id: 3,
                        season_number: 2,
                    },
                ],
            )
            .await?;
        lookup.assert();
        episodes.assert();
        season.assert();
        Ok(())
    }

    #[test]
    fn search_type_selects_target() -> anyhow::Result<()> {
        let record = failed_import("abc");
        assert_eq!(
            client(false, SearchType::Episode)?.search_target(&record),
            Some(SearchItem::Episode { id: 11 })
        );
        assert_eq!(
            client(false, SearchType::Season)?.search_target(&record),
            Some(SearchItem::Season {
                series_id: 3,
                season_number: 1
            })
        );
        assert_eq!(
            client(false, SearchType::Series)?.search_target(&record),
            Some(SearchItem::Series { series_id: 3 })
        );
        Ok(())
    }

    #[test]
    fn records_without_ids_are_invalid() -> anyhow::Result<()> {
        let client = client(false, SearchType::Episode)?;
        assert!(client.is_record_valid(&failed_import("abc")));
        let mut missing = failed_import("abc");
        missing.episode_id = None;
        assert!(!client.is_record_valid(&missing));
        assert!(!client.is_record_valid(&failed_import("")));
        Ok(())
    }

    #[test]
    fn failed_import_strikes_until_limit() -> anyhow::Result<()> {
        let client = client(false, SearchType::Episode)?;
        let record = failed_import("abc");
        let policy = FailedImportConfig::default();
        assert!(!client.should_remove_from_queue(&record, false, 3, &policy));
        assert!(!client.should_remove_from_queue(&record, false, 3, &policy));
        assert!(client.should_remove_from_queue(&record, false, 3, &policy));
        Ok(())
    }

    #[test]
    fn failed_import_exemptions() -> anyhow::Result<()> {
        let client = client(false, SearchType::Episode)?;
        let record = failed_import("abc");
        let policy = FailedImportConfig {
            ignore_private: true,
            ignored_patterns: vec!["ELIGIBLE FOR IMPORT".to_string()],
            ..FailedImportConfig::default()
        };
        assert!(!client.should_remove_from_queue(&record, false, 3, &policy));
        assert!(!client.should_remove_from_queue(&record, true, 3, &FailedImportConfig {
            ignore_private: true,
            ..FailedImportConfig::default()
        }));
        assert!(!client.should_remove_from_queue(&record, false, 0, &FailedImportConfig::default()));

        let mut healthy = failed_import("def");
        healthy.tracked_download_status = "ok".to_string();
        assert!(!client.should_remove_from_queue(&healthy, false, 3, &FailedImportConfig::default()));
        assert_eq!(client.api().striker().strike_count("abc", StrikeType::FailedImport), 0);
        Ok(())
    }
}
