//! Queue pagination.

use sweeparr_config::ArrInstanceConfig;
use tracing::warn;

use crate::client::ArrClient;
use crate::model::QueueRecord;

/// Upper bound on pages fetched per instance, whatever the reported total.
pub const MAX_QUEUE_PAGES: u32 = 100;

/// Walks an arr queue page by page.
///
/// Stops on an empty page, once the reported total has been seen, or after
/// [`MAX_QUEUE_PAGES`] pages.
pub struct QueuePager<'a> {
    client: &'a dyn ArrClient,
    instance: &'a ArrInstanceConfig,
    page: u32,
    processed: u64,
    done: bool,
}

impl<'a> QueuePager<'a> {
    /// Start before the first page.
    #[must_use]
    pub fn new(client: &'a dyn ArrClient, instance: &'a ArrInstanceConfig) -> Self {
        Self {
            client,
            instance,
            page: 0,
            processed: 0,
            done: false,
        }
    }

    /// Fetch the next page, or `None` when the queue is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates request failures; the pager stops afterwards.
    pub async fn next_page(&mut self) -> anyhow::Result<Option<Vec<QueueRecord>>> {
        if self.done {
            return Ok(None);
        }
        if self.page >= MAX_QUEUE_PAGES {
            warn!(instance = %self.instance.name, pages = self.page, "queue page limit reached");
            self.done = true;
            return Ok(None);
        }
        self.page += 1;
        let response = match self.client.get_queue_items(self.instance, self.page).await {
            Ok(response) => response,
            Err(err) => {
                self.done = true;
                return Err(err);
            }
        };
        if response.records.is_empty() {
            self.done = true;
            return Ok(None);
        }
        self.processed += response.records.len() as u64;
        if self.processed >= response.total_records {
            self.done = true;
        }
        Ok(Some(response.records))
    }
}
