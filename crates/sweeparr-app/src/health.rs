//! Download client probes and the `/health` + `/metrics` listener.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use sweeparr_core::DownloadClient;
use sweeparr_events::{Event, EventBus};
use sweeparr_telemetry::{Metrics, MetricsSnapshot, build_sha};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// Build identifier.
    pub build: String,
    /// Clients that failed their last probe.
    pub degraded: Vec<String>,
    /// Selected counters.
    pub metrics: MetricsSnapshot,
}

/// Tracks which download clients answer their connectivity probe.
pub struct HealthMonitor {
    clients: Vec<Arc<dyn DownloadClient>>,
    degraded: Mutex<Vec<String>>,
    events: EventBus,
    metrics: Metrics,
}

impl HealthMonitor {
    /// Monitor over the configured clients; all start healthy.
    #[must_use]
    pub fn new(clients: Vec<Arc<dyn DownloadClient>>, events: EventBus, metrics: Metrics) -> Self {
        Self {
            clients,
            degraded: Mutex::new(Vec::new()),
            events,
            metrics,
        }
    }

    /// Probe every client, publish a change, and return the degraded names.
    pub async fn probe(&self) -> Vec<String> {
        let mut degraded = Vec::new();
        for client in &self.clients {
            if let Err(err) = client.test_connection().await {
                warn!(client = %client.name(), error = %err, "download client unreachable");
                degraded.push(client.name().to_string());
            }
        }

        let changed = {
            let mut current = self.lock_degraded();
            let changed = *current != degraded;
            current.clone_from(&degraded);
            changed
        };
        self.metrics.set_degraded_clients(degraded.len());
        if changed {
            info!(degraded = ?degraded, "download client health changed");
            let _ = self.events.publish(Event::HealthChanged {
                degraded: degraded.clone(),
            });
        }
        degraded
    }

    /// Current report.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        let degraded = self.lock_degraded().clone();
        HealthReport {
            status: if degraded.is_empty() { "ok" } else { "degraded" },
            build: build_sha().to_string(),
            degraded,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Probe every `period` until shutdown; the first probe is left to the caller.
    pub fn spawn(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        self.probe().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn lock_degraded(&self) -> MutexGuard<'_, Vec<String>> {
        self.degraded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Router exposing `/health` and `/metrics`.
pub fn router(monitor: Arc<HealthMonitor>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(monitor)
}

async fn health(State(monitor): State<Arc<HealthMonitor>>) -> (StatusCode, Json<HealthReport>) {
    let report = monitor.report();
    let status = if report.degraded.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn metrics(State(monitor): State<Arc<HealthMonitor>>) -> Response {
    match monitor.metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body))
            .unwrap_or_else(|err| {
                error!(error = %err, "failed to build metrics response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Bind the health listener.
///
/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> AppResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Server {
            operation: "health.bind",
            addr,
            source,
        })
}

/// Serve the health router on `listener` until shutdown is signalled.
///
/// # Errors
///
/// Returns an error when the listener fails while serving.
pub async fn serve(
    listener: TcpListener,
    monitor: Arc<HealthMonitor>,
    mut shutdown: watch::Receiver<bool>,
) -> AppResult<()> {
    let addr = listener.local_addr().map_err(|source| AppError::Io {
        operation: "health.local_addr",
        source,
    })?;
    info!(addr = %addr, "health listener started");
    axum::serve(listener, router(monitor))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|source| AppError::Server {
            operation: "health.serve",
            addr,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClient;

    fn monitor(client: &Arc<FakeClient>, events: &EventBus) -> anyhow::Result<HealthMonitor> {
        let clients: Vec<Arc<dyn DownloadClient>> = vec![client.clone()];
        Ok(HealthMonitor::new(clients, events.clone(), Metrics::new()?))
    }

    #[tokio::test]
    async fn probe_publishes_only_changes() -> anyhow::Result<()> {
        let client = FakeClient::shared();
        let events = EventBus::new();
        let monitor = monitor(&client, &events)?;

        assert!(monitor.probe().await.is_empty());
        client.set_offline(true);
        assert_eq!(monitor.probe().await, vec!["fake"]);
        assert_eq!(monitor.probe().await, vec!["fake"]);
        client.set_offline(false);
        assert!(monitor.probe().await.is_empty());

        let changes: Vec<_> = events
            .backlog_since(0)
            .into_iter()
            .map(|envelope| envelope.event)
            .collect();
        assert_eq!(
            changes,
            vec![
                Event::HealthChanged {
                    degraded: vec!["fake".to_string()]
                },
                Event::HealthChanged {
                    degraded: Vec::new()
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_unavailable_while_degraded() -> anyhow::Result<()> {
        let client = FakeClient::shared();
        let monitor = Arc::new(monitor(&client, &EventBus::new())?);

        let (status, Json(report)) = health(State(Arc::clone(&monitor))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, "ok");

        client.set_offline(true);
        monitor.probe().await;
        let (status, Json(report)) = health(State(Arc::clone(&monitor))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.degraded, vec!["fake"]);
        assert_eq!(report.metrics.degraded_clients, 1);
        Ok(())
    }

    #[tokio::test]
    async fn metrics_are_served_as_text() -> anyhow::Result<()> {
        let monitor = Arc::new(monitor(&FakeClient::shared(), &EventBus::new())?);
        monitor.metrics.inc_strike("stalled");

        let response = metrics(State(monitor)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&header::HeaderValue::from_static("text/plain; version=0.0.4"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn listener_stops_on_shutdown() -> anyhow::Result<()> {
        let monitor = Arc::new(monitor(&FakeClient::shared(), &EventBus::new())?);
        let listener = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, monitor, shutdown_rx));

        shutdown_tx.send(true)?;
        tokio::time::timeout(Duration::from_secs(5), server).await???;
        Ok(())
    }
}
