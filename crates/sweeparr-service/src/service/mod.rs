//! `DownloadService`: one facade per configured download client.
//!
//! Every operation fetches fresh client state, runs its decision logic, and
//! routes the single mutating call through [`DryRun`]. Strike counters live
//! in the shared [`Striker`] so several jobs can evaluate the same hash.

mod blocking;
mod cleaning;
mod queue;
mod unlinked;

use std::sync::Arc;

use sweeparr_core::{DownloadClient, DownloadRecord, DryRun, Striker};
use sweeparr_events::EventBus;

pub use cleaning::seeding_check;

/// Evaluation facade wrapping a single download client.
pub struct DownloadService {
    client: Arc<dyn DownloadClient>,
    striker: Arc<Striker>,
    dry_run: DryRun,
    events: EventBus,
}

impl DownloadService {
    /// Wrap `client` with the shared striker, dry-run switch, and event bus.
    #[must_use]
    pub fn new(
        client: Arc<dyn DownloadClient>,
        striker: Arc<Striker>,
        dry_run: DryRun,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            striker,
            dry_run,
            events,
        }
    }

    /// Configured client name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.client.name()
    }

    /// Underlying driver.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn DownloadClient> {
        &self.client
    }

    /// Establish the client session.
    ///
    /// # Errors
    ///
    /// Propagates driver login failures.
    pub async fn login(&self) -> anyhow::Result<()> {
        self.client.login().await
    }

    /// Fetch a single download.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>> {
        self.client.get_download(hash).await
    }

    /// Downloads currently seeding.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn list_seeding(&self) -> anyhow::Result<Vec<DownloadRecord>> {
        self.client.list_seeding().await
    }

    /// Delete a download and its data, unless dry run is enabled.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn delete_download(&self, hash: &str) -> anyhow::Result<()> {
        let client = Arc::clone(&self.client);
        self.dry_run
            .intercept("delete_download", || async move {
                client.delete_download(hash).await
            })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService")
            .field("client", &self.client.name())
            .field("kind", &self.client.kind())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingClient, downloading};
    use std::time::Duration;

    #[tokio::test]
    async fn dry_run_skips_delete() -> anyhow::Result<()> {
        let client = RecordingClient::shared();
        client.put(downloading("abc", "Movie"));
        let service = DownloadService::new(
            client.clone(),
            Arc::new(Striker::new(Duration::from_secs(60))),
            DryRun::new(true),
            EventBus::new(),
        );
        service.delete_download("abc").await?;
        assert!(client.calls().is_empty());
        assert!(service.get_download("abc").await?.is_some());
        Ok(())
    }
}
