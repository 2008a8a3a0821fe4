//! Snapshot holder that re-reads the configuration file when it changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::error::ConfigResult;
use crate::loader::load_config;
use crate::model::AppConfig;

struct Loaded {
    snapshot: Arc<AppConfig>,
    modified: Option<SystemTime>,
}

/// File-backed configuration service handing out immutable snapshots.
///
/// Jobs take one snapshot per tick; a refresh never alters a snapshot that
/// is already in use.
pub struct ConfigService {
    path: PathBuf,
    state: Mutex<Loaded>,
}

impl ConfigService {
    /// Load the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the initial document cannot be read or is invalid.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let config = load_config(&path)?;
        let modified = modified_at(&path);
        Ok(Self {
            path,
            state: Mutex::new(Loaded {
                snapshot: Arc::new(config),
                modified,
            }),
        })
    }

    /// Wrap an in-memory configuration; refreshes re-read `path` once it changes.
    #[must_use]
    pub fn from_config(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(Loaded {
                snapshot: Arc::new(config),
                modified: None,
            }),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AppConfig> {
        Arc::clone(&self.lock_state().snapshot)
    }

    /// Re-read the file when its modification time changed.
    ///
    /// Returns `true` when a new snapshot was installed. Invalid documents
    /// are logged and the previous snapshot stays active.
    pub fn refresh(&self) -> bool {
        let modified = modified_at(&self.path);
        if modified.is_none() || modified == self.lock_state().modified {
            return false;
        }
        match load_config(&self.path) {
            Ok(config) => {
                let mut state = self.lock_state();
                state.snapshot = Arc::new(config);
                state.modified = modified;
                drop(state);
                info!(path = %self.path.display(), "configuration reloaded");
                true
            }
            Err(err) => {
                self.lock_state().modified = modified;
                warn!(
                    path = %self.path.display(),
                    error = ?err,
                    "configuration reload rejected; keeping previous snapshot"
                );
                false
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Loaded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
