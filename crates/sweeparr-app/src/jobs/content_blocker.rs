//! Content blocker: skips blocklisted files of queued torrents and removes
//! queue items left with nothing wanted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sweeparr_arr::{ArrClient, SearchItem};
use sweeparr_config::{AppConfig, ArrInstanceConfig, ContentBlockerConfig};
use sweeparr_core::{BlockFilesResult, DeleteReason};
use sweeparr_service::{Blocklist, IgnoreRules};
use tracing::{debug, error, info, warn};

use super::{Job, JobContext, QueueGroup, ignore_rules, queue_groups};

/// Content blocker job.
pub struct ContentBlocker {
    context: Arc<JobContext>,
}

impl ContentBlocker {
    /// Job over the shared services.
    #[must_use]
    pub const fn new(context: Arc<JobContext>) -> Self {
        Self { context }
    }

    async fn block_instance(
        &self,
        arr: &dyn ArrClient,
        instance: &ArrInstanceConfig,
        ignore: &IgnoreRules,
        blocklist: &Blocklist,
        settings: &ContentBlockerConfig,
    ) -> anyhow::Result<usize> {
        let mut targets: Vec<SearchItem> = Vec::new();
        let mut removed = 0;
        for group in queue_groups(arr, instance).await? {
            if !group.first().is_torrent() {
                continue;
            }
            match self
                .block_group(arr, instance, &group, ignore, blocklist, settings)
                .await
            {
                Ok(Some(found)) => {
                    removed += 1;
                    targets.extend(found);
                }
                Ok(None) => {}
                Err(err) => error!(
                    instance = %instance.name,
                    hash = %group.hash,
                    title = %group.first().title,
                    error = %err,
                    "failed to block files of queue item"
                ),
            }
        }
        if !targets.is_empty() {
            arr.search_items(instance, &targets).await?;
        }
        Ok(removed)
    }

    async fn block_group(
        &self,
        arr: &dyn ArrClient,
        instance: &ArrInstanceConfig,
        group: &QueueGroup,
        ignore: &IgnoreRules,
        blocklist: &Blocklist,
        settings: &ContentBlockerConfig,
    ) -> anyhow::Result<Option<Vec<SearchItem>>> {
        let result = self
            .block_files(&group.hash, ignore, blocklist, settings.ignore_private)
            .await?;
        if !result.should_remove {
            return Ok(None);
        }
        let record = group.first();
        let remove_from_client = !result.is_private || settings.delete_private;
        arr.delete_queue_item(
            instance,
            record,
            remove_from_client,
            DeleteReason::AllFilesBlocked,
        )
        .await?;
        Ok(Some(
            group
                .records
                .iter()
                .filter_map(|record| arr.search_target(record))
                .collect(),
        ))
    }

    /// First client that knows the hash decides; errors surface only when no
    /// client found it.
    async fn block_files(
        &self,
        hash: &str,
        ignore: &IgnoreRules,
        blocklist: &Blocklist,
        ignore_private: bool,
    ) -> anyhow::Result<BlockFilesResult> {
        let mut failure = None;
        for service in self.context.services() {
            match service
                .block_unwanted_files(hash, ignore, blocklist, ignore_private)
                .await
            {
                Ok(result) if result.found => return Ok(result),
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        client = %service.name(),
                        hash,
                        error = %err,
                        "content blocking failed"
                    );
                    failure = Some(err.context(format!("client {} unavailable", service.name())));
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        debug!(hash, "download not found in any client");
        Ok(BlockFilesResult::default())
    }
}

#[async_trait]
impl Job for ContentBlocker {
    fn name(&self) -> &'static str {
        "content_blocker"
    }

    fn enabled(&self, config: &AppConfig) -> bool {
        config.content_blocker.enabled
    }

    fn interval(&self, config: &AppConfig) -> Duration {
        config.content_blocker.interval()
    }

    async fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        let settings = &config.content_blocker;
        let ignore = ignore_rules(config);
        let blocklists = self.context.blocklists();
        blocklists.clear();
        for arr in self.context.arrs() {
            let instance_type = arr.instance_type();
            let blocklist = match blocklists.load(settings.blocklist(instance_type)).await {
                Ok(Some(blocklist)) => blocklist,
                Ok(None) => {
                    debug!(%instance_type, "no blocklist configured");
                    continue;
                }
                Err(err) => {
                    error!(%instance_type, error = %err, "failed to load blocklist");
                    continue;
                }
            };
            for instance in &config.arr(instance_type).instances {
                match self
                    .block_instance(arr.as_ref(), instance, &ignore, &blocklist, settings)
                    .await
                {
                    Ok(removed) => info!(instance = %instance.name, removed, "content blocked"),
                    Err(err) => error!(
                        instance = %instance.name,
                        error = %err,
                        "content blocking failed for instance"
                    ),
                }
            }
        }
        Ok(())
    }
}
