//! Ignored download matching.

use sweeparr_core::DownloadRecord;

/// Case-insensitive ignore entries from `general.ignored_downloads`.
///
/// An entry matches the hash, the category, any tag, a tracker host suffix,
/// or a substring of the download name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    entries: Vec<String>,
}

impl IgnoreRules {
    /// Normalise the configured entries; blank ones are dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| entry.as_ref().trim().to_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    /// Whether no entries are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the download must be left alone.
    #[must_use]
    pub fn matches(&self, record: &DownloadRecord) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let name = record.name.to_lowercase();
        self.entries.iter().any(|entry| {
            record.hash.eq_ignore_ascii_case(entry)
                || record
                    .category
                    .as_deref()
                    .is_some_and(|category| category.to_lowercase() == *entry)
                || record.tags.iter().any(|tag| tag.to_lowercase() == *entry)
                || record.trackers.iter().any(|host| host.ends_with(entry.as_str()))
                || name.contains(entry.as_str())
        })
    }
}
