//! Span helpers for the process and for individual job ticks.

use tracing::span::EnteredSpan;
use tracing::Span;
use uuid::Uuid;

use crate::init::build_sha;

/// Keeps the process span entered until dropped.
///
/// Every event logged on the owning thread carries the run mode and build.
pub struct GlobalContextGuard {
    _entered: EnteredSpan,
}

impl GlobalContextGuard {
    /// Enter the `sweeparr` span tagged with `mode` (`once` or `daemon`).
    #[must_use]
    pub fn new(mode: &'static str) -> Self {
        let span = tracing::info_span!("sweeparr", mode, build_sha = %build_sha());
        Self {
            _entered: span.entered(),
        }
    }
}

/// Span wrapping a single job tick.
#[must_use]
pub fn job_span(job: &str, run_id: Uuid) -> Span {
    tracing::info_span!("job", job = %job, run_id = %run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest_and_drop_in_order() {
        let outer = GlobalContextGuard::new("once");
        {
            let _tick = job_span("queue_cleaner", Uuid::new_v4()).entered();
            tracing::info!("inside job tick");
        }
        drop(outer);
    }
}
