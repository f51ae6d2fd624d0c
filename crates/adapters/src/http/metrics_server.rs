use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::routing::get;

use infrastructure::metrics::AgentMetrics;

/// Content-Type for `OpenMetrics` text exposition format.
const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Run the observability listener (`/metrics` and `/healthz`).
///
/// Shuts down gracefully when `shutdown` resolves, draining in-flight
/// connections before returning.
pub async fn run_metrics_server(
    metrics: Arc<AgentMetrics>,
    bind_address: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let router = Router::new()
        .route("/metrics", get(serve_metrics))
        .route("/healthz", get(serve_healthz))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(format!("{bind_address}:{port}")).await?;
    tracing::info!(%bind_address, port, "metrics listener started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serves Prometheus metrics in `OpenMetrics` text format.
async fn serve_metrics(
    State(metrics): State<Arc<AgentMetrics>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], metrics.encode())
}

async fn serve_healthz() -> &'static str {
    "ok"
}
