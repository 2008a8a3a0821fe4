//! Content blocking: mark blocklisted files as skipped.

use std::sync::Arc;

use sweeparr_core::BlockFilesResult;
use sweeparr_events::Event;
use tracing::{debug, info};

use super::DownloadService;
use crate::blocklist::Blocklist;
use crate::ignore::IgnoreRules;

impl DownloadService {
    /// Skip every file of `hash` the blocklist marks unwanted.
    ///
    /// `should_remove` is set when no wanted file is left.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn block_unwanted_files(
        &self,
        hash: &str,
        ignore: &IgnoreRules,
        blocklist: &Blocklist,
        ignore_private: bool,
    ) -> anyhow::Result<BlockFilesResult> {
        let Some(record) = self.client.get_download(hash).await? else {
            return Ok(BlockFilesResult::default());
        };
        let mut result = BlockFilesResult {
            found: true,
            is_private: record.is_private,
            ..BlockFilesResult::default()
        };
        if ignore.matches(&record) {
            info!(hash = %record.hash, name = %record.name, "download is ignored");
            return Ok(result);
        }
        if record.is_private && ignore_private {
            debug!(hash = %record.hash, "private download exempt from content blocking");
            return Ok(result);
        }
        let Some(files) = self.client.get_files(&record.hash).await? else {
            return Ok(result);
        };

        let mut already_skipped = 0;
        let mut unwanted = Vec::new();
        for file in &files {
            if file.priority.is_skipped() {
                already_skipped += 1;
            } else if blocklist.is_unwanted(file.file_name()) {
                debug!(hash = %record.hash, file = %file.name, "file is blocked");
                unwanted.push(file.index);
            }
        }
        result.blocked = unwanted.len();
        result.should_remove = !files.is_empty() && already_skipped + unwanted.len() == files.len();

        if !unwanted.is_empty() {
            let client = Arc::clone(&self.client);
            let indexes = unwanted.as_slice();
            let target = record.hash.as_str();
            self.dry_run
                .intercept("set_file_priority", || async move {
                    client.set_file_priority(target, indexes, true).await
                })
                .await?;
            info!(
                hash = %record.hash,
                name = %record.name,
                blocked = unwanted.len(),
                "unwanted files marked as skipped"
            );
            let _ = self.events.publish(Event::FilesBlocked {
                hash: record.hash.clone(),
                name: record.name.clone(),
                blocked: unwanted.len(),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sweeparr_config::BlocklistType;
    use sweeparr_core::{DryRun, FilePriority, Striker};
    use sweeparr_events::EventBus;

    use super::*;
    use crate::testing::{RecordingClient, downloading, file, published};

    fn service(client: &Arc<RecordingClient>, dry_run: bool, events: &EventBus) -> DownloadService {
        DownloadService::new(
            client.clone(),
            Arc::new(Striker::new(Duration::from_secs(60))),
            DryRun::new(dry_run),
            events.clone(),
        )
    }

    fn blocklist() -> anyhow::Result<Blocklist> {
        Ok(Blocklist::parse("*sample*\n*.exe", BlocklistType::Blacklist)?)
    }

    fn seed(client: &RecordingClient) {
        client.put(downloading("abc", "Movie.2024"));
        client.put_files(
            "abc",
            vec![
                file(0, "Movie/Movie.2024.mkv", FilePriority::Normal),
                file(1, "Movie/sample.mkv", FilePriority::Normal),
                file(2, "Movie/setup.exe", FilePriority::Normal),
            ],
        );
    }

    #[tokio::test]
    async fn blocked_files_are_skipped_and_reported() -> anyhow::Result<()> {
        let client = RecordingClient::shared();
        seed(&client);
        let events = EventBus::new();
        let result = service(&client, false, &events)
            .block_unwanted_files("abc", &IgnoreRules::default(), &blocklist()?, false)
            .await?;
        assert_eq!(result.blocked, 2);
        assert!(!result.should_remove);
        assert_eq!(client.calls(), vec!["set_file_priority:abc:[1, 2]:true".to_string()]);
        assert!(matches!(
            published(&events).as_slice(),
            [Event::FilesBlocked { blocked: 2, .. }]
        ));
        Ok(())
    }

    #[tokio::test]
    async fn blocking_twice_is_idempotent() -> anyhow::Result<()> {
        let client = RecordingClient::shared();
        seed(&client);
        let events = EventBus::new();
        let service = service(&client, false, &events);
        let list = blocklist()?;
        service
            .block_unwanted_files("abc", &IgnoreRules::default(), &list, false)
            .await?;
        let after_first = client.files("abc");
        let second = service
            .block_unwanted_files("abc", &IgnoreRules::default(), &list, false)
            .await?;
        assert_eq!(second.blocked, 0);
        assert_eq!(client.files("abc"), after_first);
        assert_eq!(client.calls().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn fully_blocked_download_should_be_removed() -> anyhow::Result<()> {
        let client = RecordingClient::shared();
        client.put(downloading("abc", "Movie.2024"));
        client.put_files(
            "abc",
            vec![
                file(0, "Movie/sample.mkv", FilePriority::Normal),
                file(1, "Movie/extra.nfo", FilePriority::Skip),
            ],
        );
        let result = service(&client, false, &EventBus::new())
            .block_unwanted_files("abc", &IgnoreRules::default(), &blocklist()?, false)
            .await?;
        assert!(result.should_remove);
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_decides_without_mutating() -> anyhow::Result<()> {
        let client = RecordingClient::shared();
        seed(&client);
        let events = EventBus::new();
        let result = service(&client, true, &events)
            .block_unwanted_files("abc", &IgnoreRules::default(), &blocklist()?, false)
            .await?;
        assert_eq!(result.blocked, 2);
        assert!(client.calls().is_empty());
        assert_eq!(published(&events).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn private_and_ignored_downloads_are_untouched() -> anyhow::Result<()> {
        let client = RecordingClient::shared();
        seed(&client);
        let mut private = downloading("def", "Private.Movie");
        private.is_private = true;
        client.put(private);
        client.put_files("def", vec![file(0, "sample.mkv", FilePriority::Normal)]);
        let service = service(&client, false, &EventBus::new());
        let list = blocklist()?;

        let ignored = service
            .block_unwanted_files("abc", &IgnoreRules::new(["movie.2024"]), &list, false)
            .await?;
        let exempt = service
            .block_unwanted_files("def", &IgnoreRules::default(), &list, true)
            .await?;
        assert_eq!(ignored.blocked, 0);
        assert!(exempt.is_private);
        assert_eq!(exempt.blocked, 0);
        assert!(client.calls().is_empty());
        Ok(())
    }
}
