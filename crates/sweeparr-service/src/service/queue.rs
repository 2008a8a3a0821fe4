//! Queue removal evaluation: skipped files, slow downloads, stalled downloads.

use sweeparr_config::{QueueCleanerConfig, SlowConfig, StalledConfig};
use sweeparr_core::{
    DeleteReason, DownloadCheckResult, DownloadRecord, DownloadState, StrikeType,
};
use tracing::{debug, info};

use super::DownloadService;
use crate::ignore::IgnoreRules;

impl DownloadService {
    /// Decide whether the arr queue item backed by `hash` should be removed.
    ///
    /// # Errors
    ///
    /// Propagates driver failures; an unknown hash is not an error.
    pub async fn should_remove_from_queue(
        &self,
        hash: &str,
        ignore: &IgnoreRules,
        policy: &QueueCleanerConfig,
    ) -> anyhow::Result<DownloadCheckResult> {
        let Some(record) = self.client.get_download(hash).await? else {
            debug!(client = %self.name(), hash, "download not found in client");
            return Ok(DownloadCheckResult::not_found());
        };
        if ignore.matches(&record) {
            info!(hash = %record.hash, name = %record.name, "download is ignored");
            return Ok(DownloadCheckResult::ignored(record.is_private));
        }

        let files = self.client.get_files(&record.hash).await?.unwrap_or_default();
        if !files.is_empty() && files.iter().all(|file| file.priority.is_skipped()) {
            let reason = if record.completed_on.is_some() && record.downloaded == 0 {
                DeleteReason::AllFilesSkippedByQBit
            } else {
                DeleteReason::AllFilesSkipped
            };
            info!(hash = %record.hash, name = %record.name, %reason, "all files are skipped");
            return Ok(DownloadCheckResult::remove(record.is_private, reason));
        }

        if let Some(reason) = self.check_slow(&record, &policy.slow) {
            return Ok(DownloadCheckResult::remove(record.is_private, reason));
        }
        if let Some(reason) = self.check_stalled(&record, &policy.stalled) {
            return Ok(DownloadCheckResult::remove(record.is_private, reason));
        }
        Ok(DownloadCheckResult::keep(record.is_private))
    }

    fn check_slow(&self, record: &DownloadRecord, slow: &SlowConfig) -> Option<DeleteReason> {
        if slow.max_strikes == 0
            || record.state != DownloadState::Downloading
            || record.download_speed == 0
        {
            return None;
        }
        if record.is_private && slow.ignore_private {
            debug!(hash = %record.hash, "private download exempt from slow check");
            return None;
        }
        if !slow.ignore_above_size.is_zero() && record.size > slow.ignore_above_size.bytes() {
            debug!(hash = %record.hash, size = record.size, "download too large for slow check");
            return None;
        }

        if !slow.min_speed.is_zero() && record.download_speed < slow.min_speed.bytes() {
            if self.strike(record, slow.max_strikes, StrikeType::SlowSpeed) {
                return Some(DeleteReason::SlowSpeed);
            }
        } else if slow.reset_strikes_on_progress {
            self.striker.reset_strikes(&record.hash, StrikeType::SlowSpeed);
        }

        let max_time = slow.max_time().duration();
        if !max_time.is_zero() && record.eta.is_some_and(|eta| eta > max_time) {
            if self.strike(record, slow.max_strikes, StrikeType::SlowTime) {
                return Some(DeleteReason::SlowTime);
            }
        } else if slow.reset_strikes_on_progress {
            self.striker.reset_strikes(&record.hash, StrikeType::SlowTime);
        }
        None
    }

    fn check_stalled(&self, record: &DownloadRecord, stalled: &StalledConfig) -> Option<DeleteReason> {
        if record.is_private && stalled.ignore_private {
            return None;
        }
        match record.state {
            DownloadState::Downloading if stalled.max_strikes > 0 => {
                self.striker
                    .observe_progress(&record.hash, StrikeType::Stalled, record.downloaded);
                (record.eta.is_none() && self.strike(record, stalled.max_strikes, StrikeType::Stalled))
                    .then_some(DeleteReason::Stalled)
            }
            DownloadState::FetchingMetadata if stalled.downloading_metadata_max_strikes > 0 => self
                .strike(
                    record,
                    stalled.downloading_metadata_max_strikes,
                    StrikeType::DownloadingMetadata,
                )
                .then_some(DeleteReason::DownloadingMetadata),
            _ => None,
        }
    }

    fn strike(&self, record: &DownloadRecord, max_strikes: u32, strike_type: StrikeType) -> bool {
        self.striker
            .strike_and_check_limit(&record.hash, &record.name, max_strikes, strike_type)
    }
}
