//! In-memory download client and arr fakes for job tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use sweeparr_arr::{ArrApi, ArrClient, QueueListResponse, QueueRecord, SearchItem};
use sweeparr_config::{AppConfig, ArrInstanceConfig};
use sweeparr_core::{
    ClientKind, DeleteReason, DownloadClient, DownloadFile, DownloadRecord, DownloadState, DryRun,
    FilePriority, InstanceType, Striker,
};
use sweeparr_events::{Event, EventBus};
use sweeparr_service::{BlocklistProvider, DownloadService};

use crate::jobs::JobContext;

/// One fake client and one fake Sonarr wired into a job context.
pub(crate) struct Harness {
    pub(crate) client: Arc<FakeClient>,
    pub(crate) arr: Arc<FakeArr>,
    pub(crate) context: Arc<JobContext>,
    pub(crate) events: EventBus,
}

impl Harness {
    pub(crate) fn new() -> anyhow::Result<Self> {
        let events = EventBus::new();
        let striker =
            Arc::new(Striker::new(Duration::from_secs(3_600)).with_events(events.clone()));
        let client = FakeClient::shared();
        let arr = FakeArr::new(Arc::clone(&striker), events.clone())?;
        let service = DownloadService::new(
            client.clone(),
            Arc::clone(&striker),
            DryRun::disabled(),
            events.clone(),
        );
        let arrs: Vec<Arc<dyn ArrClient>> = vec![arr.clone()];
        let context = Arc::new(JobContext::new(
            vec![service],
            arrs,
            BlocklistProvider::new(Duration::from_secs(1))?,
            striker,
        ));
        Ok(Self {
            client,
            arr,
            context,
            events,
        })
    }

    pub(crate) fn published(&self) -> Vec<Event> {
        self.events
            .backlog_since(0)
            .into_iter()
            .map(|envelope| envelope.event)
            .collect()
    }
}

/// Defaults plus the fake Sonarr instance.
pub(crate) fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sonarr.instances.push(instance());
    config
}

#[derive(Default)]
pub(crate) struct FakeClient {
    downloads: Mutex<HashMap<String, DownloadRecord>>,
    files: Mutex<HashMap<String, Vec<DownloadFile>>>,
    calls: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl FakeClient {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn put(&self, record: DownloadRecord, files: Vec<DownloadFile>) {
        self.files.lock().unwrap().insert(record.hash.clone(), files);
        self.downloads
            .lock()
            .unwrap()
            .insert(record.hash.clone(), record);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DownloadClient for FakeClient {
    fn name(&self) -> &str {
        "fake"
    }

    fn kind(&self) -> ClientKind {
        ClientKind::QBittorrent
    }

    async fn login(&self) -> anyhow::Result<()> {
        if *self.offline.lock().unwrap() {
            bail!("connection refused");
        }
        Ok(())
    }

    async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>> {
        if *self.offline.lock().unwrap() {
            bail!("connection refused");
        }
        Ok(self.downloads.lock().unwrap().get(hash).cloned())
    }

    async fn get_files(&self, hash: &str) -> anyhow::Result<Option<Vec<DownloadFile>>> {
        if *self.offline.lock().unwrap() {
            bail!("connection refused");
        }
        Ok(self.files.lock().unwrap().get(hash).cloned())
    }

    async fn set_file_priority(
        &self,
        hash: &str,
        indexes: &[u32],
        skip: bool,
    ) -> anyhow::Result<()> {
        self.record(format!("set_file_priority:{hash}:{indexes:?}:{skip}"));
        Ok(())
    }

    async fn delete_download(&self, hash: &str) -> anyhow::Result<()> {
        self.record(format!("delete:{hash}"));
        self.downloads.lock().unwrap().remove(hash);
        Ok(())
    }

    async fn create_category(&self, name: &str) -> anyhow::Result<()> {
        self.record(format!("create_category:{name}"));
        Ok(())
    }

    async fn set_category(&self, hash: &str, name: &str) -> anyhow::Result<()> {
        self.record(format!("set_category:{hash}:{name}"));
        Ok(())
    }

    async fn add_tag(&self, hash: &str, tag: &str) -> anyhow::Result<()> {
        self.record(format!("add_tag:{hash}:{tag}"));
        Ok(())
    }

    async fn list_seeding(&self) -> anyhow::Result<Vec<DownloadRecord>> {
        Ok(self
            .downloads
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.state == DownloadState::Seeding)
            .cloned()
            .collect())
    }
}

pub(crate) struct FakeArr {
    api: ArrApi,
    queue: Mutex<Vec<QueueRecord>>,
    deleted: Mutex<Vec<(u64, bool, DeleteReason)>>,
    searched: Mutex<Vec<SearchItem>>,
}

impl FakeArr {
    pub(crate) fn new(striker: Arc<Striker>, events: EventBus) -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(Self {
            api: ArrApi::new(Duration::from_secs(1), striker, DryRun::disabled(), events)?,
            queue: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            searched: Mutex::new(Vec::new()),
        }))
    }

    pub(crate) fn enqueue(&self, record: QueueRecord) {
        self.queue.lock().unwrap().push(record);
    }

    pub(crate) fn deleted(&self) -> Vec<(u64, bool, DeleteReason)> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn searched(&self) -> Vec<SearchItem> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArrClient for FakeArr {
    fn instance_type(&self) -> InstanceType {
        InstanceType::Sonarr
    }

    fn api(&self) -> &ArrApi {
        &self.api
    }

    fn queue_includes(&self) -> &'static [&'static str] {
        &[]
    }

    fn is_record_valid(&self, record: &QueueRecord) -> bool {
        record.download_hash().is_some() && record.episode_id.is_some()
    }

    fn search_target(&self, record: &QueueRecord) -> Option<SearchItem> {
        record.episode_id.map(|id| SearchItem::Episode { id })
    }

    async fn search_items(
        &self,
        _instance: &ArrInstanceConfig,
        items: &[SearchItem],
    ) -> anyhow::Result<()> {
        self.searched.lock().unwrap().extend_from_slice(items);
        Ok(())
    }

    async fn get_queue_items(
        &self,
        _instance: &ArrInstanceConfig,
        page: u32,
    ) -> anyhow::Result<QueueListResponse> {
        let queue = self.queue.lock().unwrap().clone();
        let total_records = queue.len() as u64;
        Ok(QueueListResponse {
            page,
            page_size: 200,
            total_records,
            records: if page == 1 { queue } else { Vec::new() },
        })
    }

    async fn delete_queue_item(
        &self,
        _instance: &ArrInstanceConfig,
        record: &QueueRecord,
        remove_from_client: bool,
        reason: DeleteReason,
    ) -> anyhow::Result<()> {
        self.deleted
            .lock()
            .unwrap()
            .push((record.id, remove_from_client, reason));
        self.queue.lock().unwrap().retain(|queued| queued.id != record.id);
        Ok(())
    }
}

pub(crate) fn instance() -> ArrInstanceConfig {
    ArrInstanceConfig {
        name: "sonarr".to_string(),
        url: "http://localhost:8989".parse().unwrap(),
        api_key: "key".to_string(),
    }
}

pub(crate) fn queued(id: u64, hash: &str, episode_id: u64) -> QueueRecord {
    QueueRecord {
        id,
        title: format!("Show.S01E{episode_id:02}"),
        download_id: hash.to_ascii_uppercase(),
        protocol: "torrent".to_string(),
        series_id: Some(1),
        episode_id: Some(episode_id),
        season_number: Some(1),
        ..QueueRecord::default()
    }
}

pub(crate) fn downloading(hash: &str, name: &str) -> DownloadRecord {
    let mut record = DownloadRecord::new(hash, name, DownloadState::Downloading);
    record.size = 10_000;
    record.eta = Some(Duration::from_secs(60));
    record
}

pub(crate) fn file(index: u32, name: &str, priority: FilePriority) -> DownloadFile {
    DownloadFile {
        index,
        name: name.to_string(),
        size: 100,
        priority,
    }
}
