use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::cache::token_state::TokenState;
use crate::config::types::ServiceConfig;
use crate::observability::metrics::Metrics;
use crate::observability::routes::MetricsState;
use crate::sinks::sink_http::SinkHttpState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub sink_http_state: Option<SinkHttpState>,
}

impl AppState {
    pub fn new(service_config: &ServiceConfig, token_state: TokenState, metrics: Arc<Metrics>) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            sink_http_state: service_config
                .sinks
                .http
                .as_ref()
                .map(|cfg| SinkHttpState::new(cfg, token_state, metrics)),
        }
    }
}

/// Metrics and HTTP sink routes of the configured service.
pub fn router(service_config: &ServiceConfig, state: AppState) -> Router {
    let mut router = state
        .metrics_state
        .router(&service_config.settings.metrics);
    if let Some(sink_http_state) = &state.sink_http_state {
        router = router.merge(sink_http_state.router());
    }
    router.with_state(state)
}

/// Start one Axum server for the metrics and the HTTP sink, serving until
/// `shutdown` resolves. Returns immediately when neither is configured.
/// `up` is 1 only while the server is serving.
pub async fn start(
    service_config: &ServiceConfig,
    token_state: TokenState,
    metrics: Arc<Metrics>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let state = AppState::new(service_config, token_state, metrics.clone());
    let app = router(service_config, state);

    let Some(server) = &service_config.settings.server else {
        info!("no server configured");
        return Ok(());
    };
    if !app.has_routes() {
        info!("no http routes configured, server not started");
        return Ok(());
    }

    let addr = format!("{}:{}", server.host, server.port);
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    metrics.up.set(1);
    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;
    metrics.up.set(0);
    info!("server stopped");
    served?;

    Ok(())
}
