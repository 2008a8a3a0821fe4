//! `ArrClient`: behaviour shared by Sonarr, Radarr and Lidarr.

use async_trait::async_trait;
use sweeparr_config::{ArrInstanceConfig, FailedImportConfig};
use sweeparr_core::{DeleteReason, InstanceType, StrikeType};
use sweeparr_events::Event;
use tracing::{debug, info};

use crate::api::ArrApi;
use crate::model::{QueueListResponse, QueueRecord, SearchItem};

/// Records requested per queue page.
pub const QUEUE_PAGE_SIZE: u32 = 200;

const FAILED_IMPORT_STATES: [&str; 3] = ["importblocked", "importpending", "importfailed"];

/// Client for one kind of arr application.
///
/// Implementors supply the API version, queue include flags, record
/// validation, and search commands; queue paging, failed-import strikes, and
/// deletes are shared.
#[async_trait]
pub trait ArrClient: Send + Sync {
    /// Arr kind.
    fn instance_type(&self) -> InstanceType;

    /// Shared transport.
    fn api(&self) -> &ArrApi;

    /// API version segment (`v3`, `v1`).
    fn api_version(&self) -> &'static str {
        "v3"
    }

    /// Records requested per queue page.
    fn page_size(&self) -> u32 {
        QUEUE_PAGE_SIZE
    }

    /// Include flags added to queue requests.
    fn queue_includes(&self) -> &'static [&'static str];

    /// Whether the record carries every id this arr needs.
    fn is_record_valid(&self, record: &QueueRecord) -> bool;

    /// Re-search target for a removed record.
    fn search_target(&self, record: &QueueRecord) -> Option<SearchItem>;

    /// Send re-search commands for `items`.
    ///
    /// # Errors
    ///
    /// Propagates command failures; title lookups never fail the search.
    async fn search_items(
        &self,
        instance: &ArrInstanceConfig,
        items: &[SearchItem],
    ) -> anyhow::Result<()>;

    /// Whether the record is stuck on an import problem.
    fn is_failed_import(&self, record: &QueueRecord) -> bool {
        record.tracked_download_status.eq_ignore_ascii_case("warning")
            && FAILED_IMPORT_STATES
                .contains(&record.tracked_download_state.to_ascii_lowercase().as_str())
    }

    /// Fetch one queue page.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    async fn get_queue_items(
        &self,
        instance: &ArrInstanceConfig,
        page: u32,
    ) -> anyhow::Result<QueueListResponse> {
        let url = ArrApi::url(instance, self.api_version(), "queue");
        let mut query = vec![
            ("page", page.to_string()),
            ("pageSize", self.page_size().to_string()),
        ];
        query.extend(
            self.queue_includes()
                .iter()
                .map(|flag| (*flag, "true".to_string())),
        );
        Ok(self
            .api()
            .get_json("arr.queue", instance, &url, &query)
            .await?)
    }

    /// Strike a failed import and report whether the limit is reached.
    ///
    /// `max_strikes` already carries the per-arr override; zero disables.
    fn should_remove_from_queue(
        &self,
        record: &QueueRecord,
        is_private: bool,
        max_strikes: u32,
        policy: &FailedImportConfig,
    ) -> bool {
        if max_strikes == 0 || !self.is_failed_import(record) {
            return false;
        }
        if is_private && policy.ignore_private {
            debug!(title = %record.title, "private download exempt from failed import check");
            return false;
        }
        if let Some(pattern) = policy
            .ignored_patterns
            .iter()
            .find(|pattern| record.status_mentions(pattern))
        {
            info!(title = %record.title, pattern = %pattern, "failed import matches ignored pattern");
            return false;
        }
        self.api().striker().strike_and_check_limit(
            &record.download_id,
            &record.title,
            max_strikes,
            StrikeType::FailedImport,
        )
    }

    /// Delete a queue item, blocklisting the release.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    async fn delete_queue_item(
        &self,
        instance: &ArrInstanceConfig,
        record: &QueueRecord,
        remove_from_client: bool,
        reason: DeleteReason,
    ) -> anyhow::Result<()> {
        let api = self.api();
        let url = ArrApi::url(instance, self.api_version(), &format!("queue/{}", record.id));
        let query = [
            ("removeFromClient", remove_from_client.to_string()),
            ("blocklist", "true".to_string()),
            ("skipRedownload", "true".to_string()),
            ("changeCategory", "false".to_string()),
        ];
        api.dry_run()
            .intercept("delete_queue_item", || async {
                Ok(api.delete("arr.queue.delete", instance, &url, &query).await?)
            })
            .await?;
        info!(
            instance = %instance.name,
            title = %record.title,
            %reason,
            remove_from_client,
            "queue item deleted"
        );
        let _ = api.events().publish(Event::QueueItemDeleted {
            instance: instance.name.clone(),
            title: record.title.clone(),
            download_id: record.download_id.clone(),
            reason: reason.as_str().to_string(),
            removed_from_client: remove_from_client,
        });
        Ok(())
    }
}

/// Send one command and publish `SearchTriggered`.
pub(crate) async fn send_search_command(
    client: &(impl ArrClient + ?Sized),
    instance: &ArrInstanceConfig,
    body: serde_json::Value,
    items: usize,
) -> anyhow::Result<()> {
    let api = client.api();
    let url = ArrApi::url(instance, client.api_version(), "command");
    api.dry_run()
        .intercept("search_items", || async {
            Ok(api.post_json("arr.command", instance, &url, &body).await?)
        })
        .await?;
    let _ = api.events().publish(Event::SearchTriggered {
        instance: instance.name.clone(),
        items,
    });
    Ok(())
}
