//! TTL-backed strike counter shared by every cleanup job.
//!
//! Entries are keyed by `(StrikeType, lowercase id)` and carry a sliding
//! expiry: each touch pushes the deadline out by the configured TTL. Expired
//! entries are purged lazily on access and by [`Striker::sweep_expired`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use sweeparr_events::{Event, EventBus};
use tracing::{info, warn};

use crate::model::StrikeType;

/// Buffer added on top of a job's tick interval to form the strike TTL.
pub const STRIKE_TTL_BUFFER: Duration = Duration::from_secs(2 * 60 * 60);

/// Longest TTL honoured; larger values are clamped.
pub const MAX_STRIKE_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

type StrikeKey = (StrikeType, String);

#[derive(Debug, Clone, Copy)]
struct StrikeEntry {
    count: u32,
    last_downloaded: Option<u64>,
    expires_at: Instant,
}

/// Concurrent strike counter with sliding expiry.
pub struct Striker {
    entries: Mutex<HashMap<StrikeKey, StrikeEntry>>,
    ttl: Mutex<Duration>,
    events: Option<EventBus>,
}

impl Striker {
    /// Create a striker whose entries live for `ttl` after their last touch.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Mutex::new(ttl.min(MAX_STRIKE_TTL)),
            events: None,
        }
    }

    /// Create a striker for a job ticking every `interval`.
    #[must_use]
    pub fn for_interval(interval: Duration) -> Self {
        Self::new(interval.saturating_add(STRIKE_TTL_BUFFER))
    }

    /// Re-derive the TTL from a reloaded tick interval.
    ///
    /// Live entries keep their deadline until their next touch.
    pub fn set_interval(&self, interval: Duration) {
        let ttl = interval.saturating_add(STRIKE_TTL_BUFFER).min(MAX_STRIKE_TTL);
        let previous = std::mem::replace(
            &mut *self.ttl.lock().unwrap_or_else(PoisonError::into_inner),
            ttl,
        );
        if previous != ttl {
            info!(ttl_secs = ttl.as_secs(), "strike ttl changed");
        }
    }

    /// Current entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        *self.ttl.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `StrikeIssued` events on the given bus.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Record one strike and report whether the limit is reached.
    ///
    /// A `max_strikes` of zero disables the check: nothing is recorded and
    /// `false` is returned.
    pub fn strike_and_check_limit(
        &self,
        id: &str,
        name: &str,
        max_strikes: u32,
        strike_type: StrikeType,
    ) -> bool {
        if max_strikes == 0 {
            return false;
        }
        let now = Instant::now();
        let expires_at = self.deadline(now);
        let key = (strike_type, id.to_ascii_lowercase());
        let count = {
            let mut entries = self.lock_entries();
            let entry = Self::live_entry(&mut entries, key, now, expires_at);
            entry.count = entry.count.saturating_add(1);
            entry.expires_at = expires_at;
            entry.count
        };

        info!(
            hash = %id,
            name,
            strike_type = %strike_type,
            strikes = count,
            max_strikes,
            "strike issued"
        );
        if count > max_strikes {
            warn!(
                hash = %id,
                name,
                strike_type = %strike_type,
                strikes = count,
                "strike count exceeds configured maximum"
            );
        }
        if let Some(events) = &self.events {
            let _ = events.publish(Event::StrikeIssued {
                hash: id.to_string(),
                name: name.to_string(),
                strike_type: strike_type.as_str().to_string(),
                strikes: count,
            });
        }
        count >= max_strikes
    }

    /// Forget every strike of the given type for `id`.
    pub fn reset_strikes(&self, id: &str, strike_type: StrikeType) {
        let removed = self
            .lock_entries()
            .remove(&(strike_type, id.to_ascii_lowercase()));
        if removed.is_some_and(|entry| entry.count > 0) {
            info!(hash = %id, strike_type = %strike_type, "strikes reset");
        }
    }

    /// Current live strike count.
    #[must_use]
    pub fn strike_count(&self, id: &str, strike_type: StrikeType) -> u32 {
        let now = Instant::now();
        self.lock_entries()
            .get(&(strike_type, id.to_ascii_lowercase()))
            .filter(|entry| entry.expires_at > now)
            .map_or(0, |entry| entry.count)
    }

    /// Record the downloaded byte count and reset strikes on forward progress.
    ///
    /// Returns `true` when the count grew since the previous observation; in
    /// that case the strike count drops to zero while the marker is kept.
    pub fn observe_progress(&self, id: &str, strike_type: StrikeType, downloaded: u64) -> bool {
        let now = Instant::now();
        let expires_at = self.deadline(now);
        let key = (strike_type, id.to_ascii_lowercase());
        let mut entries = self.lock_entries();
        let entry = Self::live_entry(&mut entries, key, now, expires_at);
        let progressed = entry
            .last_downloaded
            .is_some_and(|previous| downloaded > previous);
        entry.last_downloaded = Some(downloaded);
        entry.expires_at = expires_at;
        if progressed && entry.count > 0 {
            entry.count = 0;
            drop(entries);
            info!(hash = %id, strike_type = %strike_type, "progress detected, strikes reset");
        }
        progressed
    }

    /// Drop every expired entry and return how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    fn live_entry(
        entries: &mut HashMap<StrikeKey, StrikeEntry>,
        key: StrikeKey,
        now: Instant,
        expires_at: Instant,
    ) -> &mut StrikeEntry {
        let fresh = StrikeEntry {
            count: 0,
            last_downloaded: None,
            expires_at,
        };
        let entry = entries.entry(key).or_insert(fresh);
        if entry.expires_at <= now {
            *entry = fresh;
        }
        entry
    }

    /// `now + ttl`, shortened when that overflows `Instant`.
    fn deadline(&self, now: Instant) -> Instant {
        let ttl = self.ttl();
        now.checked_add(ttl)
            .or_else(|| now.checked_add(ttl / 2))
            .or_else(|| now.checked_add(STRIKE_TTL_BUFFER))
            .unwrap_or(now)
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<StrikeKey, StrikeEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Striker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Striker")
            .field("ttl", &self.ttl())
            .field("entries", &self.lock_entries().len())
            .finish_non_exhaustive()
    }
}
