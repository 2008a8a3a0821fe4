//! Interceptor gating every mutating call behind the global dry-run flag.

use std::future::Future;

use tracing::info;

/// Dry-run switch wrapped around individual mutating calls.
///
/// Decision logic always runs; only the thunk handed to
/// [`DryRun::intercept`] is skipped when dry run is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DryRun {
    enabled: bool,
}

impl DryRun {
    /// Construct the interceptor.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Interceptor that always executes.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Whether mutating calls are suppressed.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.enabled
    }

    /// Run `call` unless dry run is enabled.
    ///
    /// Returns `Ok(None)` when the call was skipped.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `call`.
    pub async fn intercept<T, F, Fut>(self, action: &str, call: F) -> anyhow::Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if self.enabled {
            info!(action, "[dry run] skipped mutating call");
            return Ok(None);
        }
        call().await.map(Some)
    }
}
