//! Reassign seeding downloads whose files lost every hardlink.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use sweeparr_config::UnlinkedConfig;
use sweeparr_core::DownloadRecord;
use sweeparr_events::Event;
use sweeparr_fsops::HardLinkInspector;
use tracing::{debug, error, info, warn};

use super::DownloadService;
use crate::ignore::IgnoreRules;

impl DownloadService {
    /// Move unlinked downloads to the target category, or tag them.
    ///
    /// A file that cannot be inspected counts as linked. Returns the number of
    /// downloads changed.
    pub async fn change_category_for_no_hardlinks(
        &self,
        downloads: &[DownloadRecord],
        excluded: &HashSet<String>,
        ignore: &IgnoreRules,
        unlinked: &UnlinkedConfig,
        inspector: &HardLinkInspector,
    ) -> usize {
        if !unlinked.enabled || unlinked.target_category.is_empty() {
            return 0;
        }
        if let Err(err) = inspector.populate() {
            warn!(error = %err, "failed to index ignored root, its links will count");
        }
        if !unlinked.use_tag {
            if let Err(err) = self.create_target_category(&unlinked.target_category).await {
                error!(category = %unlinked.target_category, error = %err, "failed to create category");
                return 0;
            }
        }

        let mut changed = 0;
        for download in downloads {
            if !is_candidate(download, unlinked) || excluded.contains(&download.hash) {
                continue;
            }
            if ignore.matches(download) {
                info!(hash = %download.hash, name = %download.name, "download is ignored");
                continue;
            }
            match self.has_hardlinks(download, inspector).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    error!(hash = %download.hash, error = %err, "failed to list files");
                    continue;
                }
            }
            match self.reassign(download, unlinked).await {
                Ok(()) => changed += 1,
                Err(err) => error!(
                    hash = %download.hash,
                    name = %download.name,
                    error = %err,
                    "failed to change category"
                ),
            }
        }
        changed
    }

    async fn create_target_category(&self, name: &str) -> anyhow::Result<()> {
        let client = Arc::clone(&self.client);
        self.dry_run
            .intercept("create_category", || async move {
                client.create_category(name).await
            })
            .await?;
        Ok(())
    }

    async fn has_hardlinks(
        &self,
        download: &DownloadRecord,
        inspector: &HardLinkInspector,
    ) -> anyhow::Result<bool> {
        let Some(files) = self.client.get_files(&download.hash).await? else {
            return Ok(true);
        };
        let Some(root) = download.save_path.as_deref() else {
            debug!(hash = %download.hash, "download has no save path");
            return Ok(true);
        };
        for file in files.iter().filter(|file| !file.priority.is_skipped()) {
            let path = Path::new(root).join(&file.name);
            match inspector.hardlink_count(&path) {
                Ok(0) => {}
                Ok(links) => {
                    debug!(hash = %download.hash, file = %path.display(), links, "file is linked");
                    return Ok(true);
                }
                Err(err) => {
                    debug!(hash = %download.hash, file = %path.display(), error = %err, "treating file as linked");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn reassign(&self, download: &DownloadRecord, unlinked: &UnlinkedConfig) -> anyhow::Result<()> {
        let client = Arc::clone(&self.client);
        let hash = download.hash.as_str();
        let target = unlinked.target_category.as_str();
        if unlinked.use_tag {
            self.dry_run
                .intercept("add_tag", || async move { client.add_tag(hash, target).await })
                .await?;
        } else {
            self.dry_run
                .intercept("set_category", || async move {
                    client.set_category(hash, target).await
                })
                .await?;
        }
        info!(
            hash = %download.hash,
            name = %download.name,
            category = target,
            used_tag = unlinked.use_tag,
            "unlinked download reassigned"
        );
        let _ = self.events.publish(Event::CategoryChanged {
            hash: download.hash.clone(),
            name: download.name.clone(),
            old_category: download.category_or_empty().to_string(),
            new_category: target.to_string(),
            used_tag: unlinked.use_tag,
        });
        Ok(())
    }
}

fn is_candidate(download: &DownloadRecord, unlinked: &UnlinkedConfig) -> bool {
    let category = download.category_or_empty();
    if !unlinked
        .categories
        .iter()
        .any(|source| source.eq_ignore_ascii_case(category))
    {
        return false;
    }
    if unlinked.use_tag {
        !download
            .tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(&unlinked.target_category))
    } else {
        !category.eq_ignore_ascii_case(&unlinked.target_category)
    }
}
