//! Download cleaner: removes seeding downloads past their category limits
//! and reassigns downloads whose files lost every hardlink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sweeparr_config::AppConfig;
use sweeparr_core::DownloadRecord;
use sweeparr_fsops::HardLinkInspector;
use sweeparr_service::DownloadService;
use tracing::{error, info};

use super::{Job, JobContext, ignore_rules, queued_hashes};

/// Download cleaner job.
pub struct DownloadCleaner {
    context: Arc<JobContext>,
}

impl DownloadCleaner {
    /// Job over the shared services.
    #[must_use]
    pub const fn new(context: Arc<JobContext>) -> Self {
        Self { context }
    }
}

async fn seeding(service: &DownloadService) -> Option<Vec<DownloadRecord>> {
    match service.list_seeding().await {
        Ok(downloads) => Some(downloads),
        Err(err) => {
            error!(client = %service.name(), error = %err, "failed to list seeding downloads");
            None
        }
    }
}

#[async_trait]
impl Job for DownloadCleaner {
    fn name(&self) -> &'static str {
        "download_cleaner"
    }

    fn enabled(&self, config: &AppConfig) -> bool {
        config.download_cleaner.enabled
    }

    fn interval(&self, config: &AppConfig) -> Duration {
        config.download_cleaner.interval()
    }

    async fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        let settings = &config.download_cleaner;
        // Downloads still in an arr queue may be mid-import.
        let excluded = queued_hashes(&self.context, config).await?;
        let ignore = ignore_rules(config);
        let inspector = HardLinkInspector::new(settings.unlinked.ignored_root_dir.clone());

        for service in self.context.services() {
            if !settings.categories.is_empty() {
                if let Some(downloads) = seeding(service).await {
                    let cleaned = service
                        .clean_downloads(
                            &downloads,
                            &settings.categories,
                            &excluded,
                            &ignore,
                            settings.delete_private,
                        )
                        .await;
                    info!(client = %service.name(), cleaned, "seeding downloads cleaned");
                }
            }
            if settings.unlinked.enabled {
                if let Some(downloads) = seeding(service).await {
                    let changed = service
                        .change_category_for_no_hardlinks(
                            &downloads,
                            &excluded,
                            &ignore,
                            &settings.unlinked,
                            &inspector,
                        )
                        .await;
                    info!(client = %service.name(), changed, "unlinked downloads reassigned");
                }
            }
        }
        Ok(())
    }
}
