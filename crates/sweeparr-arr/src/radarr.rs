//! Radarr client.

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

/// Radarr `/api/v3` client.
#[derive(Debug, Clone)]
pub struct RadarrClient {
    api: ArrApi,
}

#[derive(Debug, Deserialize)]
struct Movie {
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<i32>,
}

impl RadarrClient {
    /// Wrap the transport.
    #[must_use]
    pub const fn new(api: ArrApi) -> Self {
        Self { api }
    }

    async fn movie_title(&self, instance: &ArrInstanceConfig, id: u64) -> String {
        let url = ArrApi::url(instance, self.api_version(), &format!("movie/{id}"));
        match self
            .api
            .get_json::<Movie>("radarr.movie", instance, &url, &[])
            .await
        {
            Ok(Movie {
                title,
                year: Some(year),
            }) => format!("{title} ({year})"),
            Ok(movie) => movie.title,
            Err(err) => {
                debug!(instance = %instance.name, movie = id, error = %err, "movie lookup failed");
                format!("movie {id}")
            }
        }
    }
}

#[async_trait]
impl ArrClient for RadarrClient {
    fn instance_type(&self) -> InstanceType {
        InstanceType::Radarr
    }

    fn api(&self) -> &ArrApi {
        &self.api
    }

    fn queue_includes(&self) -> &'static [&'static str] {
        &["includeUnknownMovieItems", "includeMovie"]
    }

    fn is_record_valid(&self, record: &QueueRecord) -> bool {
        record.download_hash().is_some() && record.movie_id.is_some()
    }

    fn search_target(&self, record: &QueueRecord) -> Option<SearchItem> {
        record.movie_id.map(|id| SearchItem::Movie { id })
    }

    async fn search_items(
        &self,
        instance: &ArrInstanceConfig,
        items: &[SearchItem],
    ) -> anyhow::Result<()> {
        let ids: BTreeSet<u64> = items
            .iter()
            .filter_map(|item| match item {
                SearchItem::Movie { id } => Some(*id),
                _ => None,
            })
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        let mut titles = Vec::with_capacity(ids.len());
        for id in &ids {
            titles.push(self.movie_title(instance, *id).await);
        }
        info!(instance = %instance.name, movies = ?titles, "searching movies");
        send_search_command(
            self,
            instance,
            json!({ "name": "MoviesSearch", "movieIds": ids }),
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
    use sweeparr_events::{Event, EventBus};

    use super::*;

    fn client() -> anyhow::Result<RadarrClient> {
        Ok(RadarrClient::new(ArrApi::new(
            Duration::from_secs(5),
            Arc::new(Striker::new(Duration::from_secs(60))),
            DryRun::disabled(),
            EventBus::new(),
        )?))
    }

    #[tokio::test]
    async fn movies_are_searched_in_one_command() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/movie/4");
            then.status(200)
                .json_body(json!({ "title": "Movie", "year": 2024 }));
        });
        let command = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v3/command")
                .header("x-api-key", "secret")
                .json_body(json!({ "name": "MoviesSearch", "movieIds": [4, 9] }));
            then.status(201);
        });
        let instance = ArrInstanceConfig {
            name: "radarr".to_string(),
            url: server.base_url().parse()?,
            api_key: "secret".to_string(),
        };
        let client = client()?;
        client
            .search_items(
                &instance,
                &[SearchItem::Movie { id: 9 }, SearchItem::Movie { id: 4 }],
            )
            .await?;
        command.assert();
        let events = client.api().events().backlog_since(0);
        assert!(matches!(
            events.as_slice(),
            [envelope] if envelope.event == Event::SearchTriggered { instance: "radarr".to_string(), items: 2 }
        ));
        Ok(())
    }

    #[test]
    fn movie_id_is_required() -> anyhow::Result<()> {
        let client = client()?;
        let record = QueueRecord {
            download_id: "abc".to_string(),
            movie_id: Some(4),
            ..QueueRecord::default()
        };
        assert!(client.is_record_valid(&record));
        assert_eq!(client.search_target(&record), Some(SearchItem::Movie { id: 4 }));
        assert!(!client.is_record_valid(&QueueRecord {
            movie_id: None,
            ..record
        }));
        Ok(())
    }
}
