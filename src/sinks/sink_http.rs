use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::cache::token_state::TokenState;
use crate::config::sinks::HttpSinkConfig;
use crate::helpers::time::unix_to_rfc3339;
use crate::observability::metrics::Metrics;
use crate::server::server::AppState;

static HTTP_MSG: &str = "http";
static ERROR_MSG: &str = "not_available";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponseBody {
    pub token: String,
    /// seconds left
    pub expires_in: u64,
    /// RFC3339
    pub expires_at: String,
}

/// Serves the current token at one path.
#[derive(Clone)]
pub struct SinkHttpState {
    path: String,
    token_state: TokenState,
    metrics: Arc<Metrics>,
}

impl SinkHttpState {
    pub fn new(cfg: &HttpSinkConfig, token_state: TokenState, metrics: Arc<Metrics>) -> Self {
        let path = if cfg.path.starts_with('/') {
            cfg.path.clone()
        } else {
            format!("/{}", cfg.path)
        };
        Self {
            path,
            token_state,
            metrics,
        }
    }

    pub fn router(&self) -> Router<AppState> {
        Router::new().route(&self.path, get(handle_request_axum))
    }
}

async fn handle_request_axum(State(state): State<AppState>) -> Response {
    let Some(sink) = state.sink_http_state.as_ref() else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    match sink.token_state.get().await {
        Some(token) => {
            sink.metrics.sink_propagations.with_label_values(&[HTTP_MSG]).inc();
            Json(TokenResponseBody {
                expires_in: token.remaining_secs(),
                expires_at: unix_to_rfc3339(token.exp_unix_ts),
                token: token.value,
            })
            .into_response()
        }
        None => {
            sink.metrics.sink_failures.with_label_values(&[HTTP_MSG, ERROR_MSG]).inc();
            (StatusCode::NOT_FOUND, "token not available").into_response()
        }
    }
}
