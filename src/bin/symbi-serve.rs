//! HTTP verification service entrypoint.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use symbi_ticket::config::Config;
use symbi_ticket::metrics::AppMetrics;
use symbi_ticket::service::{build_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse_from_cli()?;
    let addr = config.addr;

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    if let Err(err) = metrics::set_global_recorder(recorder) {
        tracing::warn!(%err, "metrics recorder already installed");
    }
    AppMetrics::describe_all();

    let state = Arc::new(AppState::new(config, Some(handle)));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "symbi-serve listening");

    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
