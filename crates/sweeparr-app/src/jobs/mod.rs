//! Periodic cleanup jobs.
//!
//! Each job receives one configuration snapshot per tick and passes its
//! sections explicitly to the services; nothing reads configuration mid-tick.
//! A failing item is logged and the tick moves on.

mod content_blocker;
mod download_cleaner;
mod queue_cleaner;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sweeparr_arr::{ArrClient, QueuePager, QueueRecord};
use sweeparr_config::{AppConfig, ArrInstanceConfig};
use sweeparr_core::Striker;
use sweeparr_service::{BlocklistProvider, DownloadService, IgnoreRules};
use tracing::debug;

pub use content_blocker::ContentBlocker;
pub use download_cleaner::DownloadCleaner;
pub use queue_cleaner::QueueCleaner;

/// A unit of periodic work.
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used in spans, logs, and metrics.
    fn name(&self) -> &'static str;

    /// Whether the job runs under `config`.
    fn enabled(&self, config: &AppConfig) -> bool;

    /// Tick interval under `config`.
    fn interval(&self, config: &AppConfig) -> Duration;

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns an error when the tick as a whole could not run; per-item
    /// failures are logged and swallowed.
    async fn run(&self, config: &AppConfig) -> anyhow::Result<()>;
}

/// Services shared by every job.
pub struct JobContext {
    services: Vec<DownloadService>,
    arrs: Vec<Arc<dyn ArrClient>>,
    blocklists: BlocklistProvider,
    striker: Arc<Striker>,
}

impl JobContext {
    /// Bundle the services built at startup.
    #[must_use]
    pub fn new(
        services: Vec<DownloadService>,
        arrs: Vec<Arc<dyn ArrClient>>,
        blocklists: BlocklistProvider,
        striker: Arc<Striker>,
    ) -> Self {
        Self {
            services,
            arrs,
            blocklists,
            striker,
        }
    }

    /// One facade per enabled download client.
    #[must_use]
    pub fn services(&self) -> &[DownloadService] {
        &self.services
    }

    /// One client per arr type.
    #[must_use]
    pub fn arrs(&self) -> &[Arc<dyn ArrClient>] {
        &self.arrs
    }

    /// Blocklist loader.
    #[must_use]
    pub const fn blocklists(&self) -> &BlocklistProvider {
        &self.blocklists
    }

    /// Shared strike counter.
    #[must_use]
    pub fn striker(&self) -> &Striker {
        &self.striker
    }
}

/// Every job, in scheduling order.
#[must_use]
pub fn all_jobs(context: &Arc<JobContext>) -> Vec<Arc<dyn Job>> {
    vec![
        Arc::new(QueueCleaner::new(Arc::clone(context))),
        Arc::new(ContentBlocker::new(Arc::clone(context))),
        Arc::new(DownloadCleaner::new(Arc::clone(context))),
    ]
}

pub(crate) fn ignore_rules(config: &AppConfig) -> IgnoreRules {
    IgnoreRules::new(&config.general.ignored_downloads)
}

/// Queue records sharing one download.
pub(crate) struct QueueGroup {
    pub(crate) hash: String,
    pub(crate) records: Vec<QueueRecord>,
}

impl QueueGroup {
    pub(crate) fn first(&self) -> &QueueRecord {
        &self.records[0]
    }
}

/// Read the whole queue of `instance`, drop invalid records, and group the
/// rest by download hash in queue order.
pub(crate) async fn queue_groups(
    arr: &dyn ArrClient,
    instance: &ArrInstanceConfig,
) -> anyhow::Result<Vec<QueueGroup>> {
    let mut groups: Vec<QueueGroup> = Vec::new();
    let mut pager = QueuePager::new(arr, instance);
    while let Some(records) = pager.next_page().await? {
        for record in records {
            if !arr.is_record_valid(&record) {
                debug!(instance = %instance.name, title = %record.title, "skipping invalid queue record");
                continue;
            }
            let Some(hash) = record.download_hash() else {
                continue;
            };
            match groups.iter_mut().find(|group| group.hash == hash) {
                Some(group) => group.records.push(record),
                None => groups.push(QueueGroup {
                    hash,
                    records: vec![record],
                }),
            }
        }
    }
    Ok(groups)
}

/// Hashes referenced by any configured arr queue.
pub(crate) async fn queued_hashes(
    context: &JobContext,
    config: &AppConfig,
) -> anyhow::Result<HashSet<String>> {
    let mut hashes = HashSet::new();
    for arr in context.arrs() {
        for instance in &config.arr(arr.instance_type()).instances {
            let groups = queue_groups(arr.as_ref(), instance).await?;
            hashes.extend(groups.into_iter().map(|group| group.hash));
        }
    }
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use sweeparr_events::EventBus;

    use super::*;
    use crate::testing::{FakeArr, instance, queued};

    #[tokio::test]
    async fn queue_groups_merge_records_of_one_download() -> anyhow::Result<()> {
        let arr = FakeArr::new(Arc::new(Striker::new(Duration::from_secs(60))), EventBus::new())?;
        arr.enqueue(queued(1, "abc", 1));
        arr.enqueue(queued(2, "def", 2));
        arr.enqueue(queued(3, "abc", 3));
        let mut invalid = queued(4, "ghi", 4);
        invalid.episode_id = None;
        arr.enqueue(invalid);

        let groups = queue_groups(arr.as_ref(), &instance()).await?;
        let summary: Vec<_> = groups
            .iter()
            .map(|group| (group.hash.as_str(), group.records.len()))
            .collect();
        assert_eq!(summary, vec![("abc", 2), ("def", 1)]);
        assert_eq!(groups[0].first().id, 1);
        Ok(())
    }
}
