//! File name blocklists.
//!
//! One entry per line; blank lines and `#` comments are skipped. Entries
//! prefixed with `regex:` are regular expressions, everything else is a
//! case-insensitive glob. Both are matched against the bare file name.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};
use sweeparr_config::{BlocklistSettings, BlocklistType};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

const REGEX_PREFIX: &str = "regex:";

/// Compiled blocklist for one arr type.
#[derive(Debug, Clone)]
pub struct Blocklist {
    kind: BlocklistType,
    globs: GlobSet,
    regexes: Vec<Regex>,
    entries: usize,
}

impl Blocklist {
    /// Compile the entries contained in `text`.
    ///
    /// # Errors
    ///
    /// Returns an error for entries that are not valid globs or regexes.
    pub fn parse(text: &str, kind: BlocklistType) -> ServiceResult<Self> {
        let mut globs = GlobSetBuilder::new();
        let mut regexes = Vec::new();
        let mut entries = 0;
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            entries += 1;
            if let Some(pattern) = line.strip_prefix(REGEX_PREFIX) {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ServiceError::InvalidRegex {
                        pattern: pattern.to_string(),
                        source,
                    })?;
                regexes.push(regex);
            } else {
                let glob = GlobBuilder::new(line)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ServiceError::InvalidGlob {
                        pattern: line.to_string(),
                        source,
                    })?;
                globs.add(glob);
            }
        }
        let globs = globs.build().map_err(|source| ServiceError::InvalidGlob {
            pattern: String::new(),
            source,
        })?;
        Ok(Self {
            kind,
            globs,
            regexes,
            entries,
        })
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries
    }

    /// Whether the list has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// List semantics.
    #[must_use]
    pub const fn kind(&self) -> BlocklistType {
        self.kind
    }

    /// Whether a file with this name should not be downloaded.
    ///
    /// An empty list never marks anything unwanted, whitelist included.
    #[must_use]
    pub fn is_unwanted(&self, file_name: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let matched =
            self.globs.is_match(file_name) || self.regexes.iter().any(|r| r.is_match(file_name));
        match self.kind {
            BlocklistType::Blacklist => matched,
            BlocklistType::Whitelist => !matched,
        }
    }
}

/// Loads blocklists from disk or over HTTP and caches them per source.
///
/// The cache is cleared at the start of every tick.
#[derive(Debug)]
pub struct BlocklistProvider {
    http: reqwest::Client,
    cache: Mutex<HashMap<(String, BlocklistType), Arc<Blocklist>>>,
}

impl BlocklistProvider {
    /// Construct a provider whose remote fetches time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ServiceError::HttpClient { source })?;
        Ok(Self {
            http,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Drop every cached list.
    pub fn clear(&self) {
        self.lock_cache().clear();
    }

    /// Load the list configured in `settings`.
    ///
    /// Returns `Ok(None)` when the blocklist is disabled or has no source.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be read or fails to compile.
    pub async fn load(&self, settings: &BlocklistSettings) -> ServiceResult<Option<Arc<Blocklist>>> {
        let Some(source) = settings
            .path
            .as_deref()
            .map(str::trim)
            .filter(|source| settings.enabled && !source.is_empty())
        else {
            return Ok(None);
        };
        let key = (source.to_string(), settings.blocklist_type);
        if let Some(cached) = self.lock_cache().get(&key) {
            return Ok(Some(Arc::clone(cached)));
        }

        let text = self.read_source(source).await?;
        let list = Arc::new(Blocklist::parse(&text, settings.blocklist_type)?);
        debug!(source, entries = list.len(), "blocklist loaded");
        self.lock_cache().insert(key, Arc::clone(&list));
        Ok(Some(list))
    }

    async fn read_source(&self, source: &str) -> ServiceResult<String> {
        if !(source.starts_with("http://") || source.starts_with("https://")) {
            let path = PathBuf::from(source);
            return tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| ServiceError::BlocklistRead { path, source });
        }
        let fetch_error = |error: reqwest::Error| ServiceError::BlocklistFetch {
            url: source.to_string(),
            source: error,
        };
        let response = self.http.get(source).send().await.map_err(fetch_error)?;
        if !response.status().is_success() {
            return Err(ServiceError::BlocklistStatus {
                url: source.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().await.map_err(fetch_error)
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<(String, BlocklistType), Arc<Blocklist>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
