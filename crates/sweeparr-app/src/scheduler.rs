//! Job loops: one task per job, ticking on the interval of the current
//! configuration snapshot until shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use sweeparr_config::{AppConfig, ConfigService};
use sweeparr_telemetry::{Metrics, job_span};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{Instrument, debug, error, info};
use uuid::Uuid;

use crate::jobs::Job;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Run `job` every interval until `shutdown` flips to `true`.
///
/// The first tick fires immediately. A tick still running when the next one
/// is due delays it instead of overlapping.
pub fn spawn_job(
    job: Arc<dyn Job>,
    config: Arc<ConfigService>,
    metrics: Metrics,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut period = job.interval(&config.snapshot()).max(MIN_INTERVAL);
        let mut ticks = ticker(Instant::now(), period);
        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            config.refresh();
            let snapshot = config.snapshot();
            if job.enabled(&snapshot) {
                run_tick(job.as_ref(), &snapshot, &metrics).await;
            } else {
                debug!(job = job.name(), "job disabled, skipping tick");
            }

            let next = job.interval(&snapshot).max(MIN_INTERVAL);
            if next != period {
                info!(
                    job = job.name(),
                    interval_secs = next.as_secs(),
                    "job interval changed"
                );
                period = next;
                ticks = ticker(Instant::now() + period, period);
            }
        }
        debug!(job = job.name(), "job loop stopped");
    })
}

/// Run one tick inside its own span and record the outcome.
///
/// Returns whether the tick succeeded.
pub async fn run_tick(job: &dyn Job, config: &AppConfig, metrics: &Metrics) -> bool {
    let span = job_span(job.name(), Uuid::new_v4());
    async {
        debug!("job tick started");
        match job.run(config).await {
            Ok(()) => {
                metrics.inc_job_run(job.name(), "ok");
                debug!("job tick finished");
                true
            }
            Err(err) => {
                metrics.inc_job_run(job.name(), "error");
                error!(error = %err, "job tick failed");
                false
            }
        }
    }
    .instrument(span)
    .await
}

/// Run every enabled job once, in order.
///
/// Returns the number of failed ticks.
pub async fn run_once(jobs: &[Arc<dyn Job>], config: &AppConfig, metrics: &Metrics) -> usize {
    let mut failed = 0;
    for job in jobs {
        if !job.enabled(config) {
            debug!(job = job.name(), "job disabled");
            continue;
        }
        if !run_tick(job.as_ref(), config, metrics).await {
            failed += 1;
        }
    }
    failed
}
