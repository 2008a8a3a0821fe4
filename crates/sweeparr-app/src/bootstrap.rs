//! Process lifecycle: configuration, logging, service wiring, job loops, and
//! graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use sweeparr_arr::{ArrApi, ArrClient, build_arr_client};
use sweeparr_clients::build_client;
use sweeparr_config::{AppConfig, ConfigService, LogFormatSetting};
use sweeparr_core::{DownloadClient, DryRun, InstanceType, Striker};
use sweeparr_events::{Event, EventBus};
use sweeparr_service::{BlocklistProvider, DownloadService};
use sweeparr_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::health::{self, HealthMonitor};
use crate::jobs::{JobContext, all_jobs};
use crate::scheduler::{run_once, spawn_job};

const HEALTH_PROBE_PERIOD: Duration = Duration::from_secs(60);
const INSTANCE_TYPES: [InstanceType; 3] =
    [InstanceType::Sonarr, InstanceType::Radarr, InstanceType::Lidarr];

/// Entry point for the Sweeparr boot sequence.
///
/// # Errors
///
/// Returns an error when the configuration cannot be loaded, logging cannot
/// be installed, a client cannot be built, or the health listener fails.
pub async fn run_app(cli: Cli) -> AppResult<()> {
    let config = Arc::new(
        ConfigService::load(&cli.config).map_err(|err| AppError::config("config.load", err))?,
    );
    let snapshot = config.snapshot();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| snapshot.general.log_level.clone());
    init_logging(&LoggingConfig {
        level: &level,
        format: log_format(snapshot.general.log_format),
        ..LoggingConfig::default()
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(if cli.once { "once" } else { "daemon" });
    info!(config = %config.path().display(), "sweeparr starting");

    let dry_run = DryRun::new(cli.dry_run || snapshot.general.dry_run);
    if dry_run.is_enabled() {
        warn!("dry run enabled, no changes will be made");
    }

    let events = EventBus::new();
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let bridge = spawn_metrics_bridge(&events, metrics.clone());
    let striker = Arc::new(
        Striker::for_interval(snapshot.queue_cleaner.interval()).with_events(events.clone()),
    );

    let timeout = snapshot.general.http_timeout();
    let services = build_services(&snapshot, timeout, &striker, dry_run, &events)?;
    for service in &services {
        if let Err(err) = service.login().await {
            warn!(client = %service.name(), error = %err, "download client login failed");
        }
    }
    let arrs = build_arr_clients(&snapshot, timeout, &striker, dry_run, &events)?;
    let blocklists = BlocklistProvider::new(timeout).map_err(|source| AppError::Service {
        operation: "blocklist.new",
        source,
    })?;
    let clients: Vec<Arc<dyn DownloadClient>> = services
        .iter()
        .map(|service| Arc::clone(service.client()))
        .collect();
    info!(
        clients = services.len(),
        arrs = arrs.len(),
        "services ready"
    );

    let context = Arc::new(JobContext::new(services, arrs, blocklists, striker));
    let jobs = all_jobs(&context);
    let monitor = Arc::new(HealthMonitor::new(clients, events.clone(), metrics.clone()));
    monitor.probe().await;

    if cli.once {
        let failed = run_once(&jobs, &snapshot, &metrics).await;
        info!(failed, "single run finished");
        bridge.abort();
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = match snapshot.general.health_bind {
        Some(addr) => {
            let listener = health::bind(addr).await?;
            Some(tokio::spawn(health::serve(
                listener,
                Arc::clone(&monitor),
                shutdown_rx.clone(),
            )))
        }
        None => None,
    };
    let mut tasks: Vec<JoinHandle<()>> = jobs
        .into_iter()
        .map(|job| spawn_job(job, Arc::clone(&config), metrics.clone(), shutdown_rx.clone()))
        .collect();
    tasks.push(Arc::clone(&monitor).spawn(HEALTH_PROBE_PERIOD, shutdown_rx));
    info!("sweeparr running");

    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Io {
            operation: "signal.ctrl_c",
            source,
        })?;
    info!("shutdown requested, waiting for running ticks");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(err) = task.await {
            warn!(error = %err, "task join failed");
        }
    }
    bridge.abort();
    if let Some(server) = server {
        match server.await {
            Ok(result) => result?,
            Err(err) => warn!(error = %err, "health listener join failed"),
        }
    }
    info!("shutdown complete");
    Ok(())
}

const fn log_format(setting: LogFormatSetting) -> LogFormat {
    match setting {
        LogFormatSetting::Auto => LogFormat::infer(),
        LogFormatSetting::Pretty => LogFormat::Pretty,
        LogFormatSetting::Json => LogFormat::Json,
    }
}

fn build_services(
    config: &AppConfig,
    timeout: Duration,
    striker: &Arc<Striker>,
    dry_run: DryRun,
    events: &EventBus,
) -> AppResult<Vec<DownloadService>> {
    config
        .download_clients
        .iter()
        .filter(|client| client.enabled)
        .map(|client_config| {
            let client =
                build_client(client_config, timeout).map_err(|source| AppError::Client {
                    name: client_config.name.clone(),
                    source,
                })?;
            Ok(DownloadService::new(
                client,
                Arc::clone(striker),
                dry_run,
                events.clone(),
            ))
        })
        .collect()
}

fn build_arr_clients(
    config: &AppConfig,
    timeout: Duration,
    striker: &Arc<Striker>,
    dry_run: DryRun,
    events: &EventBus,
) -> AppResult<Vec<Arc<dyn ArrClient>>> {
    let api = ArrApi::new(timeout, Arc::clone(striker), dry_run, events.clone())
        .map_err(|err| AppError::arr("arr.api", err))?;
    Ok(INSTANCE_TYPES
        .into_iter()
        .filter(|instance_type| !config.arr(*instance_type).instances.is_empty())
        .map(|instance_type| {
            build_arr_client(
                instance_type,
                api.clone(),
                config.arr(instance_type).search_type,
            )
        })
        .collect())
}

fn record_event(metrics: &Metrics, event: &Event) {
    match event {
        Event::StrikeIssued { strike_type, .. } => metrics.inc_strike(strike_type),
        Event::QueueItemDeleted { reason, .. } => metrics.inc_queue_item_removed(reason),
        Event::DownloadCleaned { reason, .. } => metrics.inc_download_cleaned(reason),
        Event::CategoryChanged { .. } => metrics.inc_category_changed(),
        Event::FilesBlocked { blocked, .. } => metrics.add_files_blocked(*blocked),
        Event::SearchTriggered { .. } | Event::HealthChanged { .. } => {}
    }
}

/// Feed domain events into the Prometheus counters.
fn spawn_metrics_bridge(events: &EventBus, metrics: Metrics) -> JoinHandle<()> {
    let mut stream = events.subscribe();
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(envelope) => {
                    debug!(id = envelope.id, event = envelope.event.kind(), "event published");
                    record_event(&metrics, &envelope.event);
                }
                Err(err) => warn!(error = %err, "metrics bridge fell behind the event bus"),
            }
        }
    })
}
