//! Queue cleaner: removes failed imports and stalled, slow, or fully skipped
//! downloads from arr queues, then asks the arr to search again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sweeparr_arr::{ArrClient, SearchItem};
use sweeparr_config::{AppConfig, ArrInstanceConfig, QueueCleanerConfig};
use sweeparr_core::{DeleteReason, DownloadCheckResult};
use sweeparr_service::IgnoreRules;
use tracing::{debug, error, info, warn};

use super::{Job, JobContext, QueueGroup, ignore_rules, queue_groups};

/// Queue cleaner job.
pub struct QueueCleaner {
    context: Arc<JobContext>,
}

impl QueueCleaner {
    /// Job over the shared services.
    #[must_use]
    pub const fn new(context: Arc<JobContext>) -> Self {
        Self { context }
    }

    async fn clean_instance(
        &self,
        arr: &dyn ArrClient,
        instance: &ArrInstanceConfig,
        ignore: &IgnoreRules,
        policy: &QueueCleanerConfig,
        failed_import_max_strikes: u32,
    ) -> anyhow::Result<usize> {
        let mut targets = Vec::new();
        let mut removed = 0;
        for group in queue_groups(arr, instance).await? {
            match self
                .evaluate(arr, instance, &group, ignore, policy, failed_import_max_strikes)
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
                    "failed to evaluate queue item"
                ),
            }
        }
        if !targets.is_empty() {
            arr.search_items(instance, &targets).await?;
        }
        Ok(removed)
    }

    /// Remove the group when a check says so; returns its re-search targets.
    async fn evaluate(
        &self,
        arr: &dyn ArrClient,
        instance: &ArrInstanceConfig,
        group: &QueueGroup,
        ignore: &IgnoreRules,
        policy: &QueueCleanerConfig,
        failed_import_max_strikes: u32,
    ) -> anyhow::Result<Option<Vec<SearchItem>>> {
        let record = group.first();
        let check = if record.is_torrent() {
            self.check_download(&group.hash, ignore, policy).await?
        } else {
            DownloadCheckResult::not_found()
        };
        if check.ignored {
            return Ok(None);
        }

        let reason = if check.should_remove {
            check.delete_reason
        } else if arr.should_remove_from_queue(
            record,
            check.is_private,
            failed_import_max_strikes,
            &policy.failed_import,
        ) {
            DeleteReason::FailedImport
        } else {
            return Ok(None);
        };

        let remove_from_client = !check.is_private || deletes_private(reason, policy);
        arr.delete_queue_item(instance, record, remove_from_client, reason)
            .await?;
        Ok(Some(
            group
                .records
                .iter()
                .filter_map(|record| arr.search_target(record))
                .collect(),
        ))
    }

    /// First client that knows the hash decides.
    ///
    /// A hash no client reports is only treated as unknown when every client
    /// answered; otherwise the item is left alone until the next tick.
    async fn check_download(
        &self,
        hash: &str,
        ignore: &IgnoreRules,
        policy: &QueueCleanerConfig,
    ) -> anyhow::Result<DownloadCheckResult> {
        let mut failure = None;
        for service in self.context.services() {
            match service.should_remove_from_queue(hash, ignore, policy).await {
                Ok(result) if result.found => return Ok(result),
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        client = %service.name(),
                        hash,
                        error = %err,
                        "download check failed"
                    );
                    failure = Some(err.context(format!("client {} unavailable", service.name())));
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        debug!(hash, "download not found in any client");
        Ok(DownloadCheckResult::not_found())
    }
}

/// Whether a private download's data is deleted for `reason`.
fn deletes_private(reason: DeleteReason, policy: &QueueCleanerConfig) -> bool {
    match reason {
        DeleteReason::Stalled | DeleteReason::DownloadingMetadata => policy.stalled.delete_private,
        DeleteReason::SlowSpeed | DeleteReason::SlowTime => policy.slow.delete_private,
        DeleteReason::FailedImport => policy.failed_import.delete_private,
        DeleteReason::AllFilesSkipped | DeleteReason::AllFilesSkippedByQBit => true,
        DeleteReason::AllFilesBlocked | DeleteReason::None => false,
    }
}

#[async_trait]
impl Job for QueueCleaner {
    fn name(&self) -> &'static str {
        "queue_cleaner"
    }

    fn enabled(&self, config: &AppConfig) -> bool {
        config.queue_cleaner.enabled
    }

    fn interval(&self, config: &AppConfig) -> Duration {
        config.queue_cleaner.interval()
    }

    async fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        self.context
            .striker()
            .set_interval(config.queue_cleaner.interval());
        let expired = self.context.striker().sweep_expired();
        if expired > 0 {
            debug!(expired, "expired strikes dropped");
        }
        let policy = &config.queue_cleaner;
        let ignore = ignore_rules(config);
        for arr in self.context.arrs() {
            let arr_config = config.arr(arr.instance_type());
            let max_strikes =
                arr_config.effective_failed_import_max_strikes(policy.failed_import.max_strikes);
            for instance in &arr_config.instances {
                match self
                    .clean_instance(arr.as_ref(), instance, &ignore, policy, max_strikes)
                    .await
                {
                    Ok(removed) => info!(instance = %instance.name, removed, "queue cleaned"),
                    Err(err) => error!(
                        instance = %instance.name,
                        error = %err,
                        "queue cleaning failed for instance"
                    ),
                }
            }
        }
        Ok(())
    }
}
