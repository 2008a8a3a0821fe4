//! Driver trait implemented by download client adapters.

use anyhow::bail;
use async_trait::async_trait;

use crate::model::{ClientKind, DownloadFile, DownloadRecord};

/// Common operation set every download client driver exposes.
///
/// Missing downloads are reported as `Ok(None)`, never as errors.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Configured client name used in logs and health reports.
    fn name(&self) -> &str;

    /// Client implementation, for logging only.
    fn kind(&self) -> ClientKind;

    /// Establish a session. Clients without credentials succeed trivially.
    async fn login(&self) -> anyhow::Result<()>;

    /// Verify connectivity; defaults to a login round-trip.
    async fn test_connection(&self) -> anyhow::Result<()> {
        self.login().await
    }

    /// Fetch a single download by hash.
    async fn get_download(&self, hash: &str) -> anyhow::Result<Option<DownloadRecord>>;

    /// Fetch the file list of a download.
    async fn get_files(&self, hash: &str) -> anyhow::Result<Option<Vec<DownloadFile>>>;

    /// Mark files as skipped (`skip = true`) or wanted again. Idempotent.
    async fn set_file_priority(&self, hash: &str, indexes: &[u32], skip: bool)
    -> anyhow::Result<()>;

    /// Remove a download together with its data.
    async fn delete_download(&self, hash: &str) -> anyhow::Result<()>;

    /// Make sure a category (or label) exists.
    async fn create_category(&self, name: &str) -> anyhow::Result<()>;

    /// Assign a category (or label) to a download.
    async fn set_category(&self, hash: &str, name: &str) -> anyhow::Result<()>;

    /// Attach a tag to a download.
    async fn add_tag(&self, hash: &str, tag: &str) -> anyhow::Result<()>;

    /// Relocate the download storage; default implementation reports lack of support.
    async fn move_download(&self, hash: &str, destination: &str) -> anyhow::Result<()> {
        let _ = (hash, destination);
        bail!("move operation not supported by this client");
    }

    /// List downloads in a seeding-equivalent state.
    async fn list_seeding(&self) -> anyhow::Result<Vec<DownloadRecord>>;
}
