//! Seeding cleanup by ratio and seeding time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sweeparr_config::CleanCategory;
use sweeparr_core::{CleanReason, DownloadRecord, SeedingCheckResult};
use sweeparr_events::Event;
use tracing::{debug, error, info};

use super::DownloadService;
use crate::ignore::IgnoreRules;

const SECS_PER_HOUR: f64 = 3_600.0;

/// Apply a category's ratio and seeding time rules.
///
/// Negative thresholds are disabled; zero cleans immediately. The ratio rule
/// only applies once `min_seed_time` is reached.
#[must_use]
pub fn seeding_check(
    category: &CleanCategory,
    ratio: f64,
    seeding_time: Duration,
) -> SeedingCheckResult {
    let hours = seeding_time.as_secs_f64() / SECS_PER_HOUR;
    let min_seed_met = category.min_seed_time <= 0.0 || hours >= category.min_seed_time;
    if category.max_ratio >= 0.0 && min_seed_met && ratio >= category.max_ratio {
        return SeedingCheckResult {
            should_clean: true,
            reason: CleanReason::MaxRatioReached,
        };
    }
    if category.max_seed_time >= 0.0
        && (category.max_seed_time <= 0.0 || hours >= category.max_seed_time)
    {
        return SeedingCheckResult {
            should_clean: true,
            reason: CleanReason::MaxSeedTimeReached,
        };
    }
    SeedingCheckResult::default()
}

impl DownloadService {
    /// Remove seeding downloads whose category rule is satisfied.
    ///
    /// `excluded` holds lowercase hashes still referenced by an arr queue.
    /// Failures are logged per download; the number of cleaned downloads is
    /// returned.
    pub async fn clean_downloads(
        &self,
        downloads: &[DownloadRecord],
        categories: &[CleanCategory],
        excluded: &HashSet<String>,
        ignore: &IgnoreRules,
        delete_private: bool,
    ) -> usize {
        let mut cleaned = 0;
        for download in downloads {
            let Some(category) = categories
                .iter()
                .find(|category| category.name.eq_ignore_ascii_case(download.category_or_empty()))
            else {
                continue;
            };
            if excluded.contains(&download.hash) {
                debug!(hash = %download.hash, "download still referenced by an arr queue");
                continue;
            }
            if ignore.matches(download) {
                info!(hash = %download.hash, name = %download.name, "download is ignored");
                continue;
            }
            if download.is_private && !delete_private {
                debug!(hash = %download.hash, "private download kept");
                continue;
            }

            let check = seeding_check(category, download.ratio, download.seeding_time);
            if !check.should_clean {
                continue;
            }
            match self.clean_one(download, category, check.reason).await {
                Ok(()) => cleaned += 1,
                Err(err) => error!(
                    hash = %download.hash,
                    name = %download.name,
                    error = %err,
                    "failed to clean download"
                ),
            }
        }
        cleaned
    }

    async fn clean_one(
        &self,
        download: &DownloadRecord,
        category: &CleanCategory,
        reason: CleanReason,
    ) -> anyhow::Result<()> {
        let client = Arc::clone(&self.client);
        let hash = download.hash.as_str();
        self.dry_run
            .intercept("delete_download", || async move {
                client.delete_download(hash).await
            })
            .await?;
        info!(
            hash = %download.hash,
            name = %download.name,
            category = %category.name,
            ratio = download.ratio,
            seeding_secs = download.seeding_time.as_secs(),
            %reason,
            "download cleaned"
        );
        let _ = self.events.publish(Event::DownloadCleaned {
            hash: download.hash.clone(),
            name: download.name.clone(),
            ratio: download.ratio,
            seeding_time_secs: download.seeding_time.as_secs(),
            category: category.name.clone(),
            reason: reason.as_str().to_string(),
        });
        Ok(())
    }
}
