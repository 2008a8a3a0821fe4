//! Transmission RPC driver.
//!
//! Requests go to `{host}/{url_base}/rpc` (the base defaults to
//! `transmission`). The daemon answers `409` with an
//! `X-Transmission-Session-Id` header until the id is echoed back; the driver
//! caches the id and retries once. Transmission has no categories, so the
//! last segment of the download directory stands in for one.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sweeparr_core::{
    ClientKind, DownloadClient, DownloadFile, DownloadRecord, DownloadState, FilePriority,
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::http::{build_http_client, ensure_success, join_url, tracker_host};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";
const DEFAULT_URL_BASE: &str = "transmission";

const TORRENT_FIELDS: [&str; 14] = [
    "hashString",
    "name",
    "status",
    "rateDownload",
    "eta",
    "sizeWhenDone",
    "downloadedEver",
    "secondsSeeding",
    "uploadRatio",
    "isPrivate",
    "labels",
    "downloadDir",
    "metadataPercentComplete",
    "trackers",
];

/// Driver for the Transmission JSON RPC interface.
pub struct TransmissionClient {
    name: String,
    http: Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    session_id: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
struct TorrentList {
    #[serde(default)]
    torrents: Vec<Torrent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Torrent {
    hash_string: String,
    name: String,
    status: i64,
    rate_download: u64,
    eta: i64,
    size_when_done: u64,
    downloaded_ever: u64,
    seconds_seeding: u64,
    upload_ratio: f64,
    is_private: bool,
    labels: Vec<String>,
    download_dir: String,
    metadata_percent_complete: f64,
    trackers: Vec<Tracker>,
}

#[derive(Debug, Default, Deserialize)]
struct Tracker {
    #[serde(default)]
    announce: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TorrentFiles {
    files: Vec<FileEntry>,
    file_stats: Vec<FileStat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileEntry {
    name: String,
    length: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileStat {
    wanted: bool,
    priority: i64,
}

fn map_state(status: i64, metadata_complete: f64) -> DownloadState {
    match status {
        0 => DownloadState::Paused,
        1 | 2 => DownloadState::Checking,
        3 | 5 => DownloadState::Queued,
        4 if metadata_complete < 1.0 => DownloadState::FetchingMetadata,
        4 => DownloadState::Downloading,
        6 => DownloadState::Seeding,
        _ => DownloadState::Unknown,
    }
}

fn map_priority(stat: &FileStat) -> FilePriority {
    if !stat.wanted {
        return FilePriority::Skip;
    }
    match stat.priority {
        p if p < 0 => FilePriority::Low,
        0 => FilePriority::Normal,
        _ => FilePriority::High,
    }
}

/// Last path segment of a download directory.
fn directory_category(download_dir: &str) -> Option<String> {
    download_dir
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn map_record(torrent: Torrent) -> DownloadRecord {
    let mut record = DownloadRecord::new(
        &torrent.hash_string,
        torrent.name,
        map_state(torrent.status, torrent.metadata_percent_complete),
    );
    record.download_speed = torrent.rate_download;
    record.eta = u64::try_from(torrent.eta)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    record.size = torrent.size_when_done;
    record.downloaded = torrent.downloaded_ever;
    record.seeding_time = Duration::from_secs(torrent.seconds_seeding);
    record.ratio = torrent.upload_ratio.max(0.0);
    record.is_private = torrent.is_private;
    record.category = directory_category(&torrent.download_dir);
    record.save_path = Some(torrent.download_dir).filter(|dir| !dir.is_empty());
    record.tags = torrent.labels;
    record.trackers = torrent
        .trackers
        .iter()
        .filter_map(|tracker| tracker_host(&tracker.announce))
        .collect();
    record
}

impl TransmissionClient {
    /// Construct a driver for the given host.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        host: &Url,
        url_base: Option<&str>,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = url_base
            .filter(|base| !base.trim_matches('/').is_empty())
            .unwrap_or(DEFAULT_URL_BASE);
        Ok(Self {
            name: name.into(),
            http: build_http_client(timeout)?,
            endpoint: join_url(host, Some(base), "rpc"),
            username: username.filter(|value| !value.is_empty()),
            password,
            session_id: Mutex::new(None),
        })
    }

    fn current_session(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, response: &Response) -> Result<(), ClientError> {
        let id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ClientError::MissingSessionId)?
            .to_string();
        *self
            .session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
        Ok(())
    }

    async fn post(&self, body: &Value) -> Result<Response, ClientError> {
        let mut request = self.http.post(&self.endpoint).json(body);
        if let Some(session) = self.current_session() {
            request = request.header(SESSION_HEADER, session);
        }
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        request.send().await.map_err(|source| ClientError::Http {
            operation: "transmission.rpc",
            url: self.endpoint.clone(),
            source,
        })
    }

    /// Call an RPC method, renewing the session id once on `409`.
    async fn call(&self, method: &str, arguments: Value) -> anyhow::Result<Value> {
        let body = json!({ "method": method, "arguments": arguments });
        let mut response = self.post(&body).await?;
        if response.status() == StatusCode::CONFLICT {
            debug!(client = %self.name, method, "renewing transmission session id");
            self.store_session(&response)?;
            response = self.post(&body).await?;
        }
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Auth {
                client: self.name.clone(),
            }
            .into());
        }
        let reply: RpcResponse = ensure_success("transmission.rpc", &self.endpoint, response)?
            .json()
            .await
            .map_err(|source| ClientError::decode("transmission.rpc", source))?;
        if reply.result != "success" {
            return Err(ClientError::Rpc {
                method: method.to_string(),
                code: None,
                message: reply.result,
            }
            .into());
        }
        Ok(reply.arguments)
    }

    async fn torrent(&self, hash: &str, fields: Value) -> anyhow::Result<Option<Value>> {
        let arguments = self
            .call(
                "torrent-get",
                json!({ "ids": [hash.to_ascii_lowercase()], "fields": fields }),
            )
            .await?;
        Ok(arguments
            .get("torrents")
            .and_then(Value::as_array)
            .and_then(|torrents| torrents.first())
            .cloned())
    }

    async fn set(&self, hash: &str, mut arguments: Value) -> anyhow::Result<()> {
        if let Some(map) = arguments.as_object_mut() {
            map.insert("ids".to_string(), json!([hash.to_ascii_lowercase()]));
        }
        self.call("torrent-set", arguments).await?;
        Ok(())
    }
}

#[async_trait]
impl DownloadClient for TransmissionClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClientKind {
        ClientKind::Transmission
    }

    async fn login(&self) -> anyhow::Result<()> {
        self.call("session-get", json!({ "fields": ["version"] }))
            .await?;
        Ok(())
    }

    async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>> {
        let Some(torrent) = self.torrent(hash, json!(TORRENT_FIELDS)).await? else {
            return Ok(None);
        };
        let torrent: Torrent = serde_json::from_value(torrent)
            .map_err(|source| ClientError::decode("torrent-get", source))?;
        Ok(Some(map_record(torrent)))
    }

    async fn get_files(&self, hash: &str) -> anyhow::Result<Option<Vec<DownloadFile>>> {
        let Some(torrent) = self.torrent(hash, json!(["files", "fileStats"])).await? else {
            return Ok(None);
        };
        let torrent: TorrentFiles = serde_json::from_value(torrent)
            .map_err(|source| ClientError::decode("torrent-get", source))?;
        let files = torrent
            .files
            .into_iter()
            .zip(torrent.file_stats)
            .zip(0_u32..)
            .map(|((file, stat), index)| DownloadFile {
                index,
                name: file.name,
                size: file.length,
                priority: map_priority(&stat),
            })
            .collect();
        Ok(Some(files))
    }

    async fn set_file_priority(
        &self,
        hash: &str,
        indexes: &[u32],
        skip: bool,
    ) -> anyhow::Result<()> {
        // Transmission reads an empty file list as every file.
        if indexes.is_empty() {
            return Ok(());
        }
        let key = if skip { "files-unwanted" } else { "files-wanted" };
        self.set(hash, json!({ key: indexes })).await
    }

    async fn delete_download(&self, hash: &str) -> anyhow::Result<()> {
        self.call(
            "torrent-remove",
            json!({ "ids": [hash.to_ascii_lowercase()], "delete-local-data": true }),
        )
        .await?;
        Ok(())
    }

    async fn create_category(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn set_category(&self, hash: &str, name: &str) -> anyhow::Result<()> {
        let Some(record) = self.get_download(hash).await? else {
            return Ok(());
        };
        if record.category.as_deref() == Some(name) {
            return Ok(());
        }
        let parent = record
            .save_path
            .as_deref()
            .map(|dir| dir.trim_end_matches(['/', '\\']))
            .unwrap_or_default();
        let destination = format!("{parent}/{name}");
        self.move_download(hash, &destination).await
    }

    async fn add_tag(&self, hash: &str, tag: &str) -> anyhow::Result<()> {
        let Some(record) = self.get_download(hash).await? else {
            return Ok(());
        };
        if record.tags.iter().any(|existing| existing == tag) {
            return Ok(());
        }
        let mut labels = record.tags;
        labels.push(tag.to_string());
        self.set(hash, json!({ "labels": labels })).await
    }

    async fn move_download(&self, hash: &str, destination: &str) -> anyhow::Result<()> {
        self.call(
            "torrent-set-location",
            json!({
                "ids": [hash.to_ascii_lowercase()],
                "location": destination,
                "move": true
            }),
        )
        .await?;
        Ok(())
    }

    async fn list_seeding(&self) -> anyhow::Result<Vec<DownloadRecord>> {
        let arguments = self
            .call("torrent-get", json!({ "fields": TORRENT_FIELDS }))
            .await?;
        let list: TorrentList = serde_json::from_value(arguments)
            .map_err(|source| ClientError::decode("torrent-get", source))?;
        Ok(list
            .torrents
            .into_iter()
            .filter(|torrent| matches!(torrent.status, 5 | 6))
            .map(map_record)
            .collect())
    }
}
