//! Router assembly and shared application state for the verification
//! service, composed the way the teacher layers `TraceLayer` over a
//! `Router` and hands it a single `Arc<State>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::ledger::Ledger;
use crate::metrics::AppMetrics;
use crate::ratelimit::RateLimiter;
use crate::revocation::RevocationStore;
use crate::store::{KvStore, MemStore};

pub struct AppState {
    pub config: Config,
    pub rate_limiter: RateLimiter,
    pub ledger: Ledger,
    pub revocation: RevocationStore,
    pub metrics: AppMetrics,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Self {
        let store: Arc<dyn KvStore> = Arc::new(MemStore::new());
        Self {
            rate_limiter: RateLimiter::new(config.rate_limit),
            ledger: Ledger::new(store.clone()),
            revocation: RevocationStore::new(store),
            metrics: AppMetrics::new(),
            prometheus_handle,
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics_text))
        .route("/metrics.json", get(handlers::metrics_json));

    let protected = Router::new()
        .route("/verify", post(handlers::verify))
        .route("/revoke", post(handlers::revoke))
        .route("/ledger", get(handlers::ledger_list))
        .route("/ledger/append", post(handlers::ledger_append))
        .route("/ledger/anchor", post(handlers::ledger_anchor_internal))
        .route("/ledger/anchor/external", post(handlers::ledger_anchor_external))
        .route("/jobs/purge", post(handlers::jobs_purge))
        .route("/jobs/anchor", post(handlers::jobs_anchor))
        .route("/jobs/drift", get(handlers::jobs_drift))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_identity));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
