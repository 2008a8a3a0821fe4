//! Prometheus-backed metrics registry and snapshot helpers.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across jobs.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    strikes_total: IntCounterVec,
    queue_items_removed_total: IntCounterVec,
    downloads_cleaned_total: IntCounterVec,
    categories_changed_total: IntCounter,
    files_blocked_total: IntCounter,
    job_runs_total: IntCounterVec,
    degraded_clients: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Download clients currently failing their connectivity probe.
    pub degraded_clients: i64,
    /// Total downloads moved to the unlinked category.
    pub categories_changed_total: u64,
    /// Total files marked as unwanted.
    pub files_blocked_total: u64,
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<C>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}

fn counter_vec(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec> {
    let collector = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

fn counter(registry: &Registry, name: &'static str, help: &str) -> Result<IntCounter> {
    let collector = IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let strikes_total = counter_vec(
            &registry,
            "strikes_total",
            "Strikes issued by strike type",
            &["type"],
        )?;
        let queue_items_removed_total = counter_vec(
            &registry,
            "queue_items_removed_total",
            "Arr queue items removed by reason",
            &["reason"],
        )?;
        let downloads_cleaned_total = counter_vec(
            &registry,
            "downloads_cleaned_total",
            "Seeding downloads cleaned by reason",
            &["reason"],
        )?;
        let categories_changed_total = counter(
            &registry,
            "categories_changed_total",
            "Downloads moved to the unlinked category or tagged",
        )?;
        let files_blocked_total = counter(
            &registry,
            "files_blocked_total",
            "Files marked as unwanted by the content blocker",
        )?;
        let job_runs_total = counter_vec(
            &registry,
            "job_runs_total",
            "Job ticks by job name and outcome",
            &["job", "outcome"],
        )?;
        let degraded_clients = IntGauge::with_opts(Opts::new(
            "degraded_clients",
            "Download clients failing their connectivity probe",
        ))
        .map_err(|source| TelemetryError::MetricsRegister {
            name: "degraded_clients",
            source,
        })?;
        let degraded_clients = register(&registry, "degraded_clients", degraded_clients)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                strikes_total,
                queue_items_removed_total,
                downloads_cleaned_total,
                categories_changed_total,
                files_blocked_total,
                job_runs_total,
                degraded_clients,
            }),
        })
    }

    /// Increment the strike counter for a strike type.
    pub fn inc_strike(&self, strike_type: &str) {
        self.inner
            .strikes_total
            .with_label_values(&[strike_type])
            .inc();
    }

    /// Increment the removed queue item counter.
    pub fn inc_queue_item_removed(&self, reason: &str) {
        self.inner
            .queue_items_removed_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the cleaned download counter.
    pub fn inc_download_cleaned(&self, reason: &str) {
        self.inner
            .downloads_cleaned_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the unlinked category change counter.
    pub fn inc_category_changed(&self) {
        self.inner.categories_changed_total.inc();
    }

    /// Add to the blocked file counter.
    pub fn add_files_blocked(&self, count: usize) {
        self.inner
            .files_blocked_total
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Record one job tick.
    pub fn inc_job_run(&self, job: &str, outcome: &str) {
        self.inner
            .job_runs_total
            .with_label_values(&[job, outcome])
            .inc();
    }

    /// Set the degraded client gauge.
    pub fn set_degraded_clients(&self, count: usize) {
        self.inner
            .degraded_clients
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            degraded_clients: self.inner.degraded_clients.get(),
            categories_changed_total: self.inner.categories_changed_total.get(),
            files_blocked_total: self.inner.files_blocked_total.get(),
        }
    }
}
