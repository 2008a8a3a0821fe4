//! Deluge Web UI JSON-RPC driver.
//!
//! Every call posts `{id, method, params}` to `/json` and expects
//! `{id, result, error}` back with the same id. Deluge has no tags; tags fall
//! back to labels from the label plugin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sweeparr_core::{
    ClientKind, DownloadClient, DownloadFile, DownloadRecord, DownloadState, FilePriority,
};
use tracing::{debug, info};
use url::Url;

use crate::error::ClientError;
use crate::http::{build_http_client, ensure_success, join_url};

const NOT_AUTHENTICATED: i64 = 1;

const STATUS_FIELDS: [&str; 13] = [
    "hash",
    "name",
    "state",
    "download_payload_rate",
    "eta",
    "total_wanted",
    "total_done",
    "seeding_time",
    "ratio",
    "private",
    "label",
    "save_path",
    "tracker_host",
];

/// Driver for the Deluge Web UI JSON-RPC endpoint.
pub struct DelugeClient {
    name: String,
    http: Client,
    endpoint: String,
    password: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TorrentStatus {
    hash: Option<String>,
    name: String,
    state: String,
    download_payload_rate: f64,
    eta: f64,
    total_wanted: u64,
    total_done: u64,
    seeding_time: f64,
    ratio: f64,
    private: bool,
    label: String,
    save_path: String,
    tracker_host: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileStatus {
    files: Vec<FileEntry>,
    file_priorities: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    index: u32,
    path: String,
    #[serde(default)]
    size: u64,
}

fn is_missing_torrent(message: &str) -> bool {
    message.contains("NoneType") && message.contains("has no attribute 'call'")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(value: f64) -> Option<Duration> {
    (value.is_finite() && value > 0.0).then(|| Duration::from_secs(value as u64))
}

fn map_state(state: &str) -> DownloadState {
    match state {
        "Downloading" => DownloadState::Downloading,
        "Seeding" => DownloadState::Seeding,
        "Paused" => DownloadState::Paused,
        "Queued" => DownloadState::Queued,
        "Checking" | "Allocating" | "Moving" => DownloadState::Checking,
        "Error" => DownloadState::Errored,
        _ => DownloadState::Unknown,
    }
}

fn map_priority(priority: i64) -> FilePriority {
    match priority {
        0 => FilePriority::Skip,
        1..=3 => FilePriority::Low,
        4 => FilePriority::Normal,
        _ => FilePriority::High,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn map_record(fallback_hash: &str, status: TorrentStatus) -> DownloadRecord {
    let hash = status.hash.as_deref().unwrap_or(fallback_hash);
    let mut record = DownloadRecord::new(hash, status.name, map_state(&status.state));
    record.download_speed = status.download_payload_rate.max(0.0) as u64;
    record.eta = whole_seconds(status.eta);
    record.size = status.total_wanted;
    record.downloaded = status.total_done;
    record.seeding_time = whole_seconds(status.seeding_time).unwrap_or_default();
    record.ratio = status.ratio;
    record.is_private = status.private;
    record.category = Some(status.label).filter(|label| !label.is_empty());
    record.save_path = Some(status.save_path).filter(|path| !path.is_empty());
    record.trackers = Some(status.tracker_host.to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .into_iter()
        .collect();
    record
}

impl DelugeClient {
    /// Construct a driver for the given host.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        host: &Url,
        url_base: Option<&str>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            name: name.into(),
            http: build_http_client(timeout)?,
            endpoint: join_url(host, url_base, "json"),
            password: password.unwrap_or_default(),
            next_id: AtomicU64::new(1),
        })
    }

    #[cfg(test)]
    fn starting_at(self, id: u64) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    /// Send a single JSON-RPC request.
    ///
    /// A "torrent not found" fault is reported as `Ok(None)`.
    async fn send_request(&self, method: &str, params: Value) -> Result<Option<Value>, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "id": id, "method": method, "params": params }))
            .send()
            .await
            .map_err(|source| ClientError::Http {
                operation: "deluge.rpc",
                url: self.endpoint.clone(),
                source,
            })?;
        let body: RpcResponse = ensure_success("deluge.rpc", &self.endpoint, response)?
            .json()
            .await
            .map_err(|source| ClientError::decode("deluge.rpc", source))?;

        if body.id != Some(id) {
            return Err(ClientError::Desync {
                method: method.to_string(),
                expected: id,
                received: body.id,
            });
        }
        if let Some(error) = body.error {
            if is_missing_torrent(&error.message) {
                return Ok(None);
            }
            return Err(ClientError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok((!body.result.is_null()).then_some(body.result))
    }

    /// Send a request, logging in once more when the session expired.
    async fn call(&self, method: &str, params: Value) -> anyhow::Result<Option<Value>> {
        match self.send_request(method, params.clone()).await {
            Err(ClientError::Rpc {
                code: Some(NOT_AUTHENTICATED),
                ..
            }) => {
                debug!(client = %self.name, method, "session expired, logging in again");
                self.login().await?;
                Ok(self.send_request(method, params).await?)
            }
            other => Ok(other?),
        }
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> anyhow::Result<Option<T>> {
        let Some(value) = self.call(method, params).await? else {
            return Ok(None);
        };
        let typed =
            serde_json::from_value(value).map_err(|source| ClientError::decode(method, source))?;
        Ok(Some(typed))
    }

    async fn file_status(&self, hash: &str) -> anyhow::Result<Option<FileStatus>> {
        let status: Option<FileStatus> = self
            .call_typed(
                "web.get_torrent_status",
                json!([hash, ["files", "file_priorities"]]),
            )
            .await?;
        Ok(status.filter(|status| !status.files.is_empty()))
    }

    async fn ensure_connected(&self) -> anyhow::Result<()> {
        let connected: bool = self
            .call_typed("web.connected", json!([]))
            .await?
            .unwrap_or(false);
        if connected {
            return Ok(());
        }
        let hosts: Vec<Vec<Value>> = self
            .call_typed("web.get_hosts", json!([]))
            .await?
            .unwrap_or_default();
        if hosts.len() > 1 {
            return Err(ClientError::MultipleHosts { count: hosts.len() }.into());
        }
        let host_id = hosts
            .first()
            .and_then(|host| host.first())
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Rpc {
                method: "web.get_hosts".to_string(),
                code: None,
                message: "no daemon hosts configured".to_string(),
            })?
            .to_string();
        self.call("web.connect", json!([host_id])).await?;
        info!(client = %self.name, "connected to deluge daemon");
        Ok(())
    }
}

#[async_trait]
impl DownloadClient for DelugeClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClientKind {
        ClientKind::Deluge
    }

    async fn login(&self) -> anyhow::Result<()> {
        let accepted = self
            .send_request("auth.login", json!([self.password]))
            .await?
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if !accepted {
            return Err(ClientError::Auth {
                client: self.name.clone(),
            }
            .into());
        }
        self.ensure_connected().await
    }

    async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>> {
        let hash = hash.to_ascii_lowercase();
        let status: Option<HashMap<String, Value>> = self
            .call_typed("web.get_torrent_status", json!([hash, STATUS_FIELDS]))
            .await?;
        let Some(status) = status.filter(|fields| !fields.is_empty()) else {
            return Ok(None);
        };
        let status: TorrentStatus = serde_json::from_value(Value::Object(status.into_iter().collect()))
            .map_err(|source| ClientError::decode("web.get_torrent_status", source))?;
        Ok(Some(map_record(&hash, status)))
    }

    async fn get_files(&self, hash: &str) -> anyhow::Result<Option<Vec<DownloadFile>>> {
        let Some(status) = self.file_status(&hash.to_ascii_lowercase()).await? else {
            return Ok(None);
        };
        let files = status
            .files
            .into_iter()
            .map(|entry| {
                let priority = status
                    .file_priorities
                    .get(entry.index as usize)
                    .copied()
                    .unwrap_or(1);
                DownloadFile {
                    index: entry.index,
                    name: entry.path,
                    size: entry.size,
                    priority: map_priority(priority),
                }
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
        let hash = hash.to_ascii_lowercase();
        let Some(status) = self.file_status(&hash).await? else {
            return Ok(());
        };
        let mut priorities = status.file_priorities;
        priorities.resize(status.files.len(), 1);
        for index in indexes {
            if let Some(priority) = priorities.get_mut(*index as usize) {
                *priority = if skip { 0 } else { 1 };
            }
        }
        self.call(
            "core.set_torrent_options",
            json!([[hash], { "file_priorities": priorities }]),
        )
        .await?;
        Ok(())
    }

    async fn delete_download(&self, hash: &str) -> anyhow::Result<()> {
        self.call(
            "core.remove_torrents",
            json!([[hash.to_ascii_lowercase()], true]),
        )
        .await?;
        Ok(())
    }

    async fn create_category(&self, name: &str) -> anyhow::Result<()> {
        let labels: Vec<String> = self
            .call_typed("label.get_labels", json!([]))
            .await?
            .unwrap_or_default();
        if labels.iter().any(|label| label.eq_ignore_ascii_case(name)) {
            return Ok(());
        }
        self.call("label.add", json!([name])).await?;
        Ok(())
    }

    async fn set_category(&self, hash: &str, name: &str) -> anyhow::Result<()> {
        self.call(
            "label.set_torrent",
            json!([hash.to_ascii_lowercase(), name]),
        )
        .await?;
        Ok(())
    }

    async fn add_tag(&self, hash: &str, tag: &str) -> anyhow::Result<()> {
        self.create_category(tag).await?;
        self.set_category(hash, tag).await
    }

    async fn move_download(&self, hash: &str, destination: &str) -> anyhow::Result<()> {
        self.call(
            "core.move_storage",
            json!([[hash.to_ascii_lowercase()], destination]),
        )
        .await?;
        Ok(())
    }

    async fn list_seeding(&self) -> anyhow::Result<Vec<DownloadRecord>> {
        let torrents: HashMap<String, TorrentStatus> = self
            .call_typed(
                "core.get_torrents_status",
                json!([{ "state": "Seeding" }, STATUS_FIELDS]),
            )
            .await?
            .unwrap_or_default();
        Ok(torrents
            .into_iter()
            .map(|(hash, status)| map_record(&hash, status))
            .collect())
    }
}
