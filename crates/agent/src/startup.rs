use std::path::Path;
use std::sync::Arc;

use adapters::http::metrics_server::run_metrics_server;
use adapters::mail::spool_source::SpoolEventSource;
use adapters::publish::log_publisher::LogPublisher;
use adapters::storage::json_state_store::JsonStateStore;
use application::alert_service::AlertAppService;
use application::dispatch::{self, run_dispatch_loop};
use application::reconcile::run_reconcile_loop;
use application::retry::{RetryPolicy, retry_with_backoff};
use domain::alert::event::AlertEvent;
use infrastructure::config::AgentConfig;
use infrastructure::constants::{
    CLEAR_SLA_TOPIC_SUFFIX, EVENT_CHANNEL_CAPACITY, GRACEFUL_SHUTDOWN_TIMEOUT,
};
use infrastructure::logging::init_logging;
use infrastructure::metrics::AgentMetrics;
use ports::secondary::message_publisher::MessagePublisher;
use ports::secondary::metrics_port::{EventMetrics, MetricsPort};
use ports::secondary::state_store::StateStore;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::shutdown::create_shutdown_token;

/// Run the daemon startup sequence and block until shutdown.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    // ── 1. Load config ──────────────────────────────────────────────
    let config = AgentConfig::load(Path::new(&cli.config))?;

    // ── 2. Initialize logging ───────────────────────────────────────
    // CLI flags take precedence over config file
    let log_level = cli.log_level.unwrap_or(config.agent.log_level);
    let log_format = cli.log_format.unwrap_or(config.agent.log_format);
    init_logging(log_level, log_format);

    // Root span fields appear in every subsequent log entry
    let _root_span = tracing::span!(
        tracing::Level::INFO,
        "service",
        service.name = "andond",
        service.version = env!("CARGO_PKG_VERSION"),
    )
    .entered();

    info!(
        config_path = %cli.config,
        application = %config.agent.application,
        log_level = log_level.as_str(),
        log_format = log_format.as_str(),
        "andond starting"
    );

    // ── 3. Wire metrics, publisher, and state store ─────────────────
    let metrics = Arc::new(AgentMetrics::new());

    let publisher: Arc<dyn MessagePublisher> = Arc::new(LogPublisher::new(
        config.agent.application.clone(),
        config.bus.client_id.clone(),
    ));
    let store: Arc<dyn StateStore> = Arc::new(JsonStateStore::new(&config.persistence.path));

    let service = Arc::new(AlertAppService::new(
        Arc::clone(&publisher),
        store,
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
        config.agent.application.clone(),
    ));

    // ── 4. Restore the persisted registry ───────────────────────────
    let restored = service.load_persisted()?;
    info!(records = restored, snapshot = %config.persistence.path, "registry restored");

    // ── 5. Connect the bus (fatal if still down after retries) ──────
    retry_with_backoff(&RetryPolicy::default(), || publisher.connect()).await?;

    // ── 6. Event channel and control subscription ───────────────────
    // Lifecycle events from the spool and clearSla requests from the
    // control channel converge on one bounded queue with a single
    // consumer, so registry mutations are applied in arrival order.
    let (events_tx, events_rx) = mpsc::channel::<AlertEvent>(EVENT_CHANNEL_CAPACITY);

    let control_tx = events_tx.clone();
    let control_metrics = Arc::clone(&metrics);
    publisher
        .subscribe(
            CLEAR_SLA_TOPIC_SUFFIX,
            Arc::new(move |_topic: &str, payload: &[u8]| match dispatch::clear_event_from_payload(payload) {
                Ok(event) => {
                    if control_tx.try_send(event).is_err() {
                        control_metrics.record_event_dropped("channel_full");
                        warn!("event channel full, dropping clearSla request");
                    }
                }
                Err(e) => {
                    control_metrics.record_event_dropped("invalid_control_payload");
                    warn!(error = %e, "ignoring malformed clearSla payload");
                }
            }),
        )
        .await?;

    // ── 7. Spawn the workers ────────────────────────────────────────
    let shutdown = create_shutdown_token();

    std::fs::create_dir_all(&config.spool.path)?;
    let source = SpoolEventSource::new(
        &config.spool.path,
        config.spool_poll_interval(),
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
    );
    let source_task = tokio::spawn(source.run(events_tx, shutdown.clone()));

    let dispatch_task = tokio::spawn(run_dispatch_loop(
        Arc::clone(&service),
        events_rx,
        shutdown.clone(),
    ));

    let reconcile_task = tokio::spawn(run_reconcile_loop(
        Arc::clone(&service),
        config.reconcile_interval(),
        shutdown.clone(),
    ));

    let metrics_bind = config.agent.bind_address.clone();
    let metrics_port = config.agent.metrics_port;
    let metrics_shutdown = shutdown.clone();
    let metrics_handle = Arc::clone(&metrics);
    let metrics_task = tokio::spawn(async move {
        let result = run_metrics_server(metrics_handle, &metrics_bind, metrics_port, async move {
            metrics_shutdown.cancelled().await;
        })
        .await;
        if let Err(e) = result {
            warn!(error = %e, "metrics listener failed");
        }
    });

    info!("andond started; press 'q' or send SIGINT/SIGTERM to exit");

    // ── 8. Wait for shutdown, then drain ────────────────────────────
    shutdown.cancelled().await;
    info!("shutdown requested, draining workers");

    let drain = async {
        let _ = source_task.await;
        let _ = dispatch_task.await;
        let _ = reconcile_task.await;
        let _ = metrics_task.await;
    };
    if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, drain)
        .await
        .is_err()
    {
        warn!("graceful shutdown timed out, exiting anyway");
    }

    // Final snapshot so a restart resumes exactly where we left off.
    service.persist_if_dirty();

    info!("andond stopped");
    Ok(())
}
