//! Hardlink counting with an optional ignored root.
//!
//! Links that live below the ignored root (for example a cross-seed
//! directory) do not count as library copies. The inode index for that root
//! is built once per [`HardLinkInspector::populate`] call and rebuilt from
//! scratch on each call, so repeated population never double counts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

type InodeKey = (u64, u64);

/// Counts hardlinks of downloaded files outside an optional ignored root.
#[derive(Debug)]
pub struct HardLinkInspector {
    ignored_root: Option<PathBuf>,
    index: Mutex<HashMap<InodeKey, u64>>,
}

impl HardLinkInspector {
    /// Construct an inspector; the index stays empty until [`Self::populate`].
    #[must_use]
    pub fn new(ignored_root: Option<PathBuf>) -> Self {
        Self {
            ignored_root,
            index: Mutex::new(HashMap::new()),
        }
    }

    /// Root whose links are ignored.
    #[must_use]
    pub fn ignored_root(&self) -> Option<&Path> {
        self.ignored_root.as_deref()
    }

    /// Rebuild the inode index of the ignored root.
    ///
    /// # Errors
    ///
    /// Returns an error when the root cannot be traversed.
    pub fn populate(&self) -> FsOpsResult<usize> {
        let Some(root) = &self.ignored_root else {
            return Ok(0);
        };
        let mut index = HashMap::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|source| FsOpsError::Walkdir {
                operation: "hardlinks.populate",
                path: root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry.metadata().map_err(|source| FsOpsError::Walkdir {
                operation: "hardlinks.populate",
                path: entry.path().to_path_buf(),
                source,
            })?;
            if let Some(key) = inode_key(&metadata) {
                *index.entry(key).or_insert(0) += 1;
            }
        }
        let files = index.len();
        *self.lock_index() = index;
        debug!(root = %root.display(), files, "ignored root indexed");
        Ok(files)
    }

    /// Number of hardlinks of `path` that are neither the file itself nor
    /// located below the ignored root.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be inspected; callers treat this
    /// as "still linked".
    pub fn hardlink_count(&self, path: &Path) -> FsOpsResult<u64> {
        let metadata = fs::metadata(path).map_err(|source| FsOpsError::Io {
            operation: "hardlinks.stat",
            path: path.to_path_buf(),
            source,
        })?;
        let links = link_count(&metadata).ok_or(FsOpsError::Unsupported {
            operation: "hardlinks.stat",
        })?;
        let Some(root) = &self.ignored_root else {
            return Ok(links.saturating_sub(1));
        };

        let in_root = inode_key(&metadata)
            .and_then(|key| self.lock_index().get(&key).copied())
            .unwrap_or(0);
        let own = u64::from(!path.starts_with(root));
        Ok(links.saturating_sub(in_root + own))
    }

    fn lock_index(&self) -> MutexGuard<'_, HashMap<InodeKey, u64>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(unix)]
fn inode_key(metadata: &fs::Metadata) -> Option<InodeKey> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn inode_key(_metadata: &fs::Metadata) -> Option<InodeKey> {
    None
}

#[cfg(unix)]
fn link_count(metadata: &fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.nlink())
}

#[cfg(not(unix))]
fn link_count(_metadata: &fs::Metadata) -> Option<u64> {
    None
}
