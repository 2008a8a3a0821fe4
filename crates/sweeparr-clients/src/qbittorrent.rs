//! qBittorrent Web API driver.
//!
//! Sessions are cookie based (`SID`). A `403` on any call triggers one
//! re-login and a single retry when credentials are configured.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sweeparr_core::{
    ClientKind, DownloadClient, DownloadFile, DownloadRecord, DownloadState, FilePriority,
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::http::{build_http_client, ensure_success, join_url, tracker_host};

/// qBittorrent reports this ETA when the remaining time is infinite.
const INFINITE_ETA: i64 = 8_640_000;

/// Driver for qBittorrent's `/api/v2` REST interface.
pub struct QBittorrentClient {
    name: String,
    http: Client,
    host: Url,
    url_base: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    hash: String,
    name: String,
    state: String,
    #[serde(default)]
    dlspeed: u64,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    downloaded: u64,
    #[serde(default)]
    seeding_time: i64,
    #[serde(default)]
    ratio: f64,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    completion_on: i64,
}

#[derive(Debug, Deserialize)]
struct TorrentProperties {
    #[serde(flatten)]
    additional: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TrackerEntry {
    url: String,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(default)]
    index: Option<u32>,
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    priority: i64,
}

impl QBittorrentClient {
    /// Construct a driver for the given host.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        host: Url,
        url_base: Option<String>,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            name: name.into(),
            http: build_http_client(timeout)?,
            host,
            url_base,
            username: username.filter(|value| !value.is_empty()),
            password,
        })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.host, self.url_base.as_deref(), path)
    }

    const fn has_credentials(&self) -> bool {
        self.username.is_some()
    }

    async fn send<F>(&self, operation: &'static str, url: &str, build: F) -> anyhow::Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let response = build(&self.http)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                operation,
                url: url.to_string(),
                source,
            })?;
        if response.status() != StatusCode::FORBIDDEN || !self.has_credentials() {
            return Ok(response);
        }

        debug!(client = %self.name, operation, "session rejected, logging in again");
        self.login().await?;
        let response = build(&self.http)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                operation,
                url: url.to_string(),
                source,
            })?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<Option<T>> {
        let url = self.url(path);
        let response = self
            .send(operation, &url, |http| http.get(&url).query(query))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(operation, &url, response)?;
        let body = response
            .json::<T>()
            .await
            .map_err(|source| ClientError::decode(operation, source))?;
        Ok(Some(body))
    }

    async fn post_form(
        &self,
        operation: &'static str,
        path: &str,
        form: &[(&str, &str)],
    ) -> anyhow::Result<Response> {
        let url = self.url(path);
        self.send(operation, &url, |http| http.post(&url).form(form))
            .await
    }

    async fn post_form_ok(
        &self,
        operation: &'static str,
        path: &str,
        form: &[(&str, &str)],
    ) -> anyhow::Result<()> {
        let url = self.url(path);
        let response = self.post_form(operation, path, form).await?;
        ensure_success(operation, &url, response)?;
        Ok(())
    }

    async fn enrich(&self, info: TorrentInfo) -> anyhow::Result<DownloadRecord> {
        let hash = info.hash.to_ascii_lowercase();
        let properties: Option<TorrentProperties> = self
            .get_json("qbittorrent.properties", "api/v2/torrents/properties", &[(
                "hash",
                hash.as_str(),
            )])
            .await?;
        let is_private = properties
            .as_ref()
            .and_then(|props| props.additional.get("is_private"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let trackers: Vec<TrackerEntry> = self
            .get_json("qbittorrent.trackers", "api/v2/torrents/trackers", &[(
                "hash",
                hash.as_str(),
            )])
            .await?
            .unwrap_or_default();
        Ok(map_record(info, is_private, &trackers))
    }
}

fn map_state(state: &str) -> DownloadState {
    match state {
        "downloading" | "forcedDL" | "stalledDL" => DownloadState::Downloading,
        "metaDL" | "forcedMetaDL" => DownloadState::FetchingMetadata,
        "uploading" | "stalledUP" | "forcedUP" => DownloadState::Seeding,
        "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => DownloadState::Paused,
        "queuedDL" | "queuedUP" => DownloadState::Queued,
        "checkingDL" | "checkingUP" | "checkingResumeData" | "allocating" | "moving" => {
            DownloadState::Checking
        }
        "error" | "missingFiles" => DownloadState::Errored,
        _ => DownloadState::Unknown,
    }
}

fn map_eta(state: &str, eta: i64) -> Option<Duration> {
    if state == "stalledDL" || eta <= 0 || eta >= INFINITE_ETA {
        return None;
    }
    u64::try_from(eta).ok().map(Duration::from_secs)
}

fn map_priority(priority: i64) -> FilePriority {
    match priority {
        0 => FilePriority::Skip,
        1..=5 => FilePriority::Normal,
        _ => FilePriority::High,
    }
}

fn map_record(info: TorrentInfo, is_private: bool, trackers: &[TrackerEntry]) -> DownloadRecord {
    let mut record = DownloadRecord::new(&info.hash, info.name, map_state(&info.state));
    record.download_speed = info.dlspeed;
    record.eta = map_eta(&info.state, info.eta);
    record.size = info.size;
    record.downloaded = info.downloaded;
    record.seeding_time = Duration::from_secs(u64::try_from(info.seeding_time).unwrap_or(0));
    record.ratio = info.ratio;
    record.is_private = is_private;
    record.category = Some(info.category).filter(|category| !category.is_empty());
    record.tags = info
        .tags
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    record.save_path = Some(info.save_path).filter(|path| !path.is_empty());
    record.trackers = trackers
        .iter()
        .filter_map(|tracker| tracker_host(&tracker.url))
        .collect();
    record.completed_on = (info.completion_on > 0)
        .then(|| DateTime::<Utc>::from_timestamp(info.completion_on, 0))
        .flatten();
    record
}

#[async_trait]
impl DownloadClient for QBittorrentClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClientKind {
        ClientKind::QBittorrent
    }

    async fn login(&self) -> anyhow::Result<()> {
        let Some(username) = self.username.as_deref() else {
            return Ok(());
        };
        let url = self.url("api/v2/auth/login");
        let password = self.password.as_deref().unwrap_or_default();
        let response = self
            .http
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|source| ClientError::Http {
                operation: "qbittorrent.login",
                url: url.clone(),
                source,
            })?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(ClientError::Auth {
                client: self.name.clone(),
            }
            .into());
        }
        let body = ensure_success("qbittorrent.login", &url, response)?
            .text()
            .await
            .map_err(|source| ClientError::decode("qbittorrent.login", source))?;
        if body.trim() == "Fails." {
            return Err(ClientError::Auth {
                client: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn test_connection(&self) -> anyhow::Result<()> {
        self.login().await?;
        let url = self.url("api/v2/app/version");
        let response = self
            .send("qbittorrent.version", &url, |http| http.get(&url))
            .await?;
        ensure_success("qbittorrent.version", &url, response)?;
        Ok(())
    }

    async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>> {
        let hash = hash.to_ascii_lowercase();
        let infos: Vec<TorrentInfo> = self
            .get_json("qbittorrent.info", "api/v2/torrents/info", &[(
                "hashes",
                hash.as_str(),
            )])
            .await?
            .unwrap_or_default();
        let Some(info) = infos.into_iter().next() else {
            return Ok(None);
        };
        self.enrich(info).await.map(Some)
    }

    async fn get_files(&self, hash: &str) -> anyhow::Result<Option<Vec<DownloadFile>>> {
        let hash = hash.to_ascii_lowercase();
        let entries: Option<Vec<FileEntry>> = self
            .get_json("qbittorrent.files", "api/v2/torrents/files", &[(
                "hash",
                hash.as_str(),
            )])
            .await?;
        Ok(entries.map(|entries| {
            entries
                .into_iter()
                .zip(0_u32..)
                .map(|(entry, position)| DownloadFile {
                    index: entry.index.unwrap_or(position),
                    name: entry.name,
                    size: entry.size,
                    priority: map_priority(entry.priority),
                })
                .collect()
        }))
    }

    async fn set_file_priority(
        &self,
        hash: &str,
        indexes: &[u32],
        skip: bool,
    ) -> anyhow::Result<()> {
        if indexes.is_empty() {
            return Ok(());
        }
        let ids = indexes
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("|");
        let priority = if skip { "0" } else { "1" };
        let hash = hash.to_ascii_lowercase();
        self.post_form_ok("qbittorrent.file_priority", "api/v2/torrents/filePrio", &[
            ("hash", hash.as_str()),
            ("id", ids.as_str()),
            ("priority", priority),
        ])
        .await
    }

    async fn delete_download(&self, hash: &str) -> anyhow::Result<()> {
        let hash = hash.to_ascii_lowercase();
        self.post_form_ok("qbittorrent.delete", "api/v2/torrents/delete", &[
            ("hashes", hash.as_str()),
            ("deleteFiles", "true"),
        ])
        .await
    }

    async fn create_category(&self, name: &str) -> anyhow::Result<()> {
        let path = "api/v2/torrents/createCategory";
        let response = self
            .post_form("qbittorrent.create_category", path, &[
                ("category", name),
                ("savePath", ""),
            ])
            .await?;
        if response.status() == StatusCode::CONFLICT {
            debug!(client = %self.name, category = name, "category already exists");
            return Ok(());
        }
        ensure_success("qbittorrent.create_category", &self.url(path), response)?;
        Ok(())
    }

    async fn set_category(&self, hash: &str, name: &str) -> anyhow::Result<()> {
        let hash = hash.to_ascii_lowercase();
        self.post_form_ok("qbittorrent.set_category", "api/v2/torrents/setCategory", &[
            ("hashes", hash.as_str()),
            ("category", name),
        ])
        .await
    }

    async fn add_tag(&self, hash: &str, tag: &str) -> anyhow::Result<()> {
        let hash = hash.to_ascii_lowercase();
        self.post_form_ok("qbittorrent.add_tag", "api/v2/torrents/addTags", &[
            ("hashes", hash.as_str()),
            ("tags", tag),
        ])
        .await
    }

    async fn move_download(&self, hash: &str, destination: &str) -> anyhow::Result<()> {
        let hash = hash.to_ascii_lowercase();
        self.post_form_ok("qbittorrent.move", "api/v2/torrents/setLocation", &[
            ("hashes", hash.as_str()),
            ("location", destination),
        ])
        .await
    }

    async fn list_seeding(&self) -> anyhow::Result<Vec<DownloadRecord>> {
        let infos: Vec<TorrentInfo> = self
            .get_json("qbittorrent.info", "api/v2/torrents/info", &[(
                "filter", "seeding",
            )])
            .await?
            .unwrap_or_default();
        let mut records = Vec::with_capacity(infos.len());
        for info in infos {
            let hash = info.hash.clone();
            let record = self
                .enrich(info)
                .await
                .with_context(|| format!("failed to load seeding download {hash}"))?;
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, username: Option<&str>) -> anyhow::Result<QBittorrentClient> {
        Ok(QBittorrentClient::new(
            "qbit",
            server.base_url().parse()?,
            None,
            username.map(str::to_string),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )?)
    }

    fn info_body(state: &str) -> Value {
        json!([{
            "hash": "ABC123",
            "name": "Show.S01E01",
            "state": state,
            "dlspeed": 500,
            "eta": 8_640_000,
            "size": 1_000_000,
            "downloaded": 0,
            "seeding_time": 0,
            "ratio": 0.0,
            "category": "tv",
            "tags": "one, two",
            "save_path": "/downloads/tv",
            "completion_on": 1_700_000_000
        }])
    }

    fn mock_enrichment(server: &MockServer, private: bool) {
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/properties");
            then.status(200)
                .json_body(json!({ "is_private": private, "save_path": "/downloads/tv" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/trackers");
            then.status(200).json_body(json!([
                { "url": "** [DHT] **" },
                { "url": "https://tracker.example.org/announce" }
            ]));
        });
    }

    #[test]
    fn state_mapping_normalises_client_states() {
        assert_eq!(map_state("stalledDL"), DownloadState::Downloading);
        assert_eq!(map_state("metaDL"), DownloadState::FetchingMetadata);
        assert_eq!(map_state("stalledUP"), DownloadState::Seeding);
        assert_eq!(map_state("stoppedDL"), DownloadState::Paused);
        assert_eq!(map_state("moving"), DownloadState::Checking);
        assert_eq!(map_state("bogus"), DownloadState::Unknown);
        assert_eq!(map_eta("downloading", INFINITE_ETA), None);
        assert_eq!(map_eta("stalledDL", 60), None);
        assert_eq!(map_eta("downloading", 60), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn get_download_maps_record_and_private_flag() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let info = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("hashes", "abc123");
            then.status(200).json_body(info_body("downloading"));
        });
        mock_enrichment(&server, true);

        let record = client(&server, None)?
            .get_download("ABC123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("expected record"))?;
        info.assert();
        assert_eq!(record.hash, "abc123");
        assert_eq!(record.state, DownloadState::Downloading);
        assert_eq!(record.eta, None);
        assert!(record.is_private);
        assert_eq!(record.category.as_deref(), Some("tv"));
        assert_eq!(record.tags, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(record.trackers, vec!["tracker.example.org".to_string()]);
        assert!(record.completed_on.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200).json_body(json!([]));
        });
        assert!(client(&server, None)?.get_download("abc").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn forbidden_response_triggers_single_relogin() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let authorised = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .header("cookie", "SID=fresh");
            then.status(200).json_body(json!([]));
        });
        let rejected = server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(403);
        });
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200)
                .header("set-cookie", "SID=fresh; path=/")
                .body("Ok.");
        });

        let result = client(&server, Some("admin"))?.get_download("abc").await?;
        assert!(result.is_none());
        rejected.assert();
        login.assert();
        authorised.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_credentials_surface_auth_error() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });
        let err = client(&server, Some("admin"))?
            .login()
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected auth failure"))?;
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Auth { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn login_without_credentials_is_a_no_op() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        client(&server, None)?.login().await?;
        Ok(())
    }

    #[tokio::test]
    async fn files_map_priorities_and_positions() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/files");
            then.status(200).json_body(json!([
                { "name": "Show/sample.mkv", "size": 10, "priority": 0 },
                { "name": "Show/episode.mkv", "size": 100, "priority": 1 },
                { "name": "Show/extra.nfo", "size": 1, "priority": 7 }
            ]));
        });
        let files = client(&server, None)?
            .get_files("abc")
            .await?
            .unwrap_or_default();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].priority, FilePriority::Skip);
        assert_eq!(files[1].index, 1);
        assert_eq!(files[2].priority, FilePriority::High);
        Ok(())
    }

    #[tokio::test]
    async fn create_category_tolerates_conflict() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let create = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/createCategory");
            then.status(409);
        });
        client(&server, None)?.create_category("unlinked").await?;
        create.assert();
        Ok(())
    }

    #[tokio::test]
    async fn mutating_calls_hit_expected_endpoints() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let prio = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/filePrio");
            then.status(200);
        });
        let delete = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/delete");
            then.status(200);
        });
        let location = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/setLocation");
            then.status(200);
        });
        let client = client(&server, None)?;
        client.set_file_priority("abc", &[0, 2], true).await?;
        client.set_file_priority("abc", &[], true).await?;
        client.delete_download("abc").await?;
        client.move_download("abc", "/data/elsewhere").await?;
        prio.assert();
        delete.assert();
        location.assert();
        Ok(())
    }

    #[tokio::test]
    async fn repeated_skip_sends_same_form() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let prio = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/filePrio")
                .body("hash=abc&id=0%7C2&priority=0");
            then.status(200);
        });
        let client = client(&server, None)?;
        client.set_file_priority("ABC", &[0, 2], true).await?;
        client.set_file_priority("ABC", &[0, 2], true).await?;
        prio.assert_hits(2);
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_surface_status() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/setCategory");
            then.status(500);
        });
        let err = client(&server, None)?
            .set_category("abc", "tv")
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::HttpStatus { status: 500, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn list_seeding_enriches_each_download() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("filter", "seeding");
            then.status(200).json_body(info_body("uploading"));
        });
        mock_enrichment(&server, false);
        let seeding = client(&server, None)?.list_seeding().await?;
        assert_eq!(seeding.len(), 1);
        assert_eq!(seeding[0].state, DownloadState::Seeding);
        assert!(!seeding[0].is_private);
        Ok(())
    }
}
