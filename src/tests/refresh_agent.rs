use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::agent::{RefreshAgent, RefreshSettings};
use crate::auth::backend::BackendCall;
use crate::auth::error::BackendError;
use crate::cache::token::Token;
use crate::cache::token_state::TokenState;
use crate::config::proc_loader::parse_config;
use crate::config::sinks::SinkMessage;
use crate::resilience::backoff::Backoff;
use crate::tests::common::{authenticator, jwt_expiring_in, token_response, MockBackend, MockReloader};

fn settings(timeout_ms: u64) -> RefreshSettings {
    RefreshSettings {
        safety_margin_seconds: 60,
        timeout: Duration::from_millis(timeout_ms),
        backoff: Backoff::new(100, 400),
    }
}

fn network_error() -> BackendError {
    BackendError::new("IAM token request failed: connection refused")
}

#[tokio::test]
async fn refreshed_token_is_published_and_next_round_scheduled_before_expiry() {
    let backend = MockBackend::new();
    let token = jwt_expiring_in(3600);
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response(&token)));

    let state = TokenState::new();
    let (tx, mut rx) = broadcast::channel(16);
    let auth = Arc::new(authenticator("profile-1", backend.clone(), MockReloader::new()));
    let mut agent = RefreshAgent::new(auth, state.clone(), settings(1000), tx);

    let next = agent.refresh_once().await;

    assert!(next <= Duration::from_secs(3540) && next >= Duration::from_secs(3530));
    assert!(!agent.force_fresh());
    assert_eq!(state.get().await.map(|t| t.value), Some(token.clone()));
    assert!(matches!(rx.recv().await.unwrap(), SinkMessage::Updated(t) if t.value == token));
}

#[tokio::test]
async fn token_inside_margin_forces_fresh_request() {
    let backend = MockBackend::new();
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response(&jwt_expiring_in(30))));
    backend.push(BackendCall::RequestNew, Ok(token_response(&jwt_expiring_in(3600))));

    let (tx, _rx) = broadcast::channel(16);
    let auth = Arc::new(authenticator("profile-1", backend.clone(), MockReloader::new()));
    let mut agent = RefreshAgent::new(auth, TokenState::new(), settings(1000), tx);

    assert_eq!(agent.refresh_once().await, Duration::from_secs(1));
    assert!(agent.force_fresh());

    agent.refresh_once().await;
    assert!(!agent.force_fresh());
    assert_eq!(
        backend.calls().iter().map(|(c, _)| *c).collect::<Vec<_>>(),
        vec![BackendCall::ReuseOrFetch, BackendCall::RequestNew]
    );
}

#[tokio::test]
async fn failures_back_off_and_reset_on_success() {
    let backend = MockBackend::new();
    backend.push(BackendCall::ReuseOrFetch, Err(network_error()));
    backend.push(BackendCall::ReuseOrFetch, Err(network_error()));
    backend.push(BackendCall::RequestNew, Err(network_error()));
    backend.push(BackendCall::RequestNew, Err(network_error()));
    backend.push(BackendCall::RequestNew, Ok(token_response(&jwt_expiring_in(3600))));

    let (tx, _rx) = broadcast::channel(16);
    let auth = Arc::new(authenticator("profile-1", backend.clone(), MockReloader::new()));
    let mut agent = RefreshAgent::new(auth, TokenState::new(), settings(1000), tx);

    assert_eq!(agent.refresh_once().await, Duration::from_millis(100));
    assert!(agent.force_fresh());
    assert_eq!(agent.refresh_once().await, Duration::from_millis(200));
    assert_eq!(agent.refresh_once().await, Duration::from_millis(400));
    assert!(agent.refresh_once().await > Duration::from_secs(60));
    assert!(!agent.force_fresh());

    // ladder starts over after a success
    assert_eq!(agent.refresh_once().await, Duration::from_millis(100));
    assert_eq!(backend.count(BackendCall::RequestNew), 3);
    assert_eq!(backend.count(BackendCall::ReuseOrFetch), 2);
}

#[tokio::test]
async fn expired_token_is_cleared_from_sinks_on_failure() {
    let backend = MockBackend::new();
    backend.push(BackendCall::ReuseOrFetch, Err(network_error()));

    let state = TokenState::new();
    state.set(Token::new("stale".into(), 0)).await;
    let (tx, mut rx) = broadcast::channel(16);
    let auth = Arc::new(authenticator("profile-1", backend, MockReloader::new()));
    let mut agent = RefreshAgent::new(auth, state.clone(), settings(1000), tx);

    agent.refresh_once().await;

    assert!(state.clear().await.is_none());
    assert!(matches!(rx.recv().await.unwrap(), SinkMessage::Cleared));
}

#[tokio::test]
async fn valid_token_survives_failed_round() {
    let backend = MockBackend::new();
    backend.push(BackendCall::ReuseOrFetch, Err(network_error()));

    let state = TokenState::new();
    state.set(Token::new("still-good".into(), 600)).await;
    let (tx, mut rx) = broadcast::channel(16);
    let auth = Arc::new(authenticator("profile-1", backend, MockReloader::new()));
    let mut agent = RefreshAgent::new(auth, state.clone(), settings(1000), tx);

    agent.refresh_once().await;

    assert_eq!(state.get().await.map(|t| t.value), Some("still-good".to_string()));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let backend = MockBackend::with_delay(Duration::from_millis(500));
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response(&jwt_expiring_in(3600))));

    let (tx, _rx) = broadcast::channel(16);
    let auth = Arc::new(authenticator("profile-1", backend, MockReloader::new()));
    let mut agent = RefreshAgent::new(auth, TokenState::new(), settings(50), tx);

    assert_eq!(agent.refresh_once().await, Duration::from_millis(100));
    assert!(agent.force_fresh());
}

#[test]
fn settings_come_from_config() {
    let cfg = parse_config(
        r#"
settings:
  safety_margin_seconds: 90
  refresh:
    timeout_ms: 2500
    base_delay_ms: 50
    max_delay_ms: 800
identity:
  auth_type: api_key
"#,
    )
    .unwrap();

    let settings = RefreshSettings::from_config(&cfg.settings);
    assert_eq!(settings.safety_margin_seconds, 90);
    assert_eq!(settings.timeout, Duration::from_millis(2500));
    assert_eq!(settings.backoff.base_delay_ms, 50);
    assert_eq!(settings.backoff.max_delay_ms, 800);
}
