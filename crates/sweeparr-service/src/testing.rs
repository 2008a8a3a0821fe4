//! In-memory download client recording every mutating call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sweeparr_core::{
    ClientKind, DownloadClient, DownloadFile, DownloadRecord, DownloadState, FilePriority,
};
use sweeparr_events::{Event, EventBus};

#[derive(Default)]
pub(crate) struct RecordingClient {
    downloads: Mutex<HashMap<String, DownloadRecord>>,
    files: Mutex<HashMap<String, Vec<DownloadFile>>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn put(&self, record: DownloadRecord) {
        self.downloads
            .lock()
            .unwrap()
            .insert(record.hash.clone(), record);
    }

    pub(crate) fn put_files(&self, hash: &str, files: Vec<DownloadFile>) {
        self.files.lock().unwrap().insert(hash.to_string(), files);
    }

    pub(crate) fn files(&self, hash: &str) -> Vec<DownloadFile> {
        self.files
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub(crate) fn downloading(hash: &str, name: &str) -> DownloadRecord {
    let mut record = DownloadRecord::new(hash, name, DownloadState::Downloading);
    record.size = 10_000;
    record.eta = Some(std::time::Duration::from_secs(60));
    record
}

pub(crate) fn published(events: &EventBus) -> Vec<Event> {
    events
        .backlog_since(0)
        .into_iter()
        .map(|envelope| envelope.event)
        .collect()
}

pub(crate) fn file(index: u32, name: &str, priority: FilePriority) -> DownloadFile {
    DownloadFile {
        index,
        name: name.to_string(),
        size: 100,
        priority,
    }
}

#[async_trait]
impl DownloadClient for RecordingClient {
    fn name(&self) -> &str {
        "recording"
    }

    fn kind(&self) -> ClientKind {
        ClientKind::QBittorrent
    }

    async fn login(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>> {
        Ok(self.downloads.lock().unwrap().get(hash).cloned())
    }

    async fn get_files(&self, hash: &str) -> anyhow::Result<Option<Vec<DownloadFile>>> {
        Ok(self.files.lock().unwrap().get(hash).cloned())
    }

    async fn set_file_priority(
        &self,
        hash: &str,
        indexes: &[u32],
        skip: bool,
    ) -> anyhow::Result<()> {
        self.record(format!("set_file_priority:{hash}:{indexes:?}:{skip}"));
        if let Some(files) = self.files.lock().unwrap().get_mut(hash) {
            for file in files.iter_mut().filter(|file| indexes.contains(&file.index)) {
                file.priority = if skip {
                    FilePriority::Skip
                } else {
                    FilePriority::Normal
                };
            }
        }
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
