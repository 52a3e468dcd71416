// Drives IdentityAuthenticator::get_token against a scripted backend:
//  - cached token reuse vs forced fresh requests
//  - expired / unreadable cached tokens falling through to a new request
//  - credential rotation picked up through the reloader

use crate::auth::backend::BackendCall;
use crate::auth::error::{AuthError, BackendError, ErrorKind};
use crate::parser::inspector::TokenParseError;
use crate::tests::common::{authenticator, jwt_expiring_in, token_response, MockBackend, MockReloader};

#[tokio::test]
async fn cached_valid_token_is_returned_without_new_request() {
    let backend = MockBackend::new();
    let reloader = MockReloader::new();
    let token = jwt_expiring_in(3600);
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response(&token)));

    let auth = authenticator("profile-1", backend.clone(), reloader.clone());
    let issued = auth.get_token(false).await.unwrap();

    assert_eq!(issued.value, token);
    assert!(issued.lifetime_secs > 3590 && issued.lifetime_secs <= 3600);
    assert_eq!(backend.count(BackendCall::ReuseOrFetch), 1);
    assert_eq!(backend.count(BackendCall::RequestNew), 0);
    assert_eq!(reloader.count(), 0);
}

#[tokio::test]
async fn force_fresh_only_requests_new_token() {
    let backend = MockBackend::new();
    let token = jwt_expiring_in(1200);
    backend.push(BackendCall::RequestNew, Ok(token_response(&token)));

    let auth = authenticator("profile-1", backend.clone(), MockReloader::new());
    let issued = auth.get_token(true).await.unwrap();

    assert_eq!(issued.value, token);
    assert_eq!(backend.count(BackendCall::ReuseOrFetch), 0);
    assert_eq!(backend.count(BackendCall::RequestNew), 1);
}

#[tokio::test]
async fn expired_cached_token_falls_through_to_new_request() {
    let backend = MockBackend::new();
    let fresh = jwt_expiring_in(3600);
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response(&jwt_expiring_in(-10))));
    backend.push(BackendCall::RequestNew, Ok(token_response(&fresh)));

    let auth = authenticator("profile-1", backend.clone(), MockReloader::new());
    let issued = auth.get_token(false).await.unwrap();

    assert_eq!(issued.value, fresh);
    assert!(issued.lifetime_secs > 0);
    assert_eq!(
        backend.calls().iter().map(|(c, _)| *c).collect::<Vec<_>>(),
        vec![BackendCall::ReuseOrFetch, BackendCall::RequestNew]
    );
}

#[tokio::test]
async fn unreadable_cached_token_falls_through_to_new_request() {
    let backend = MockBackend::new();
    let fresh = jwt_expiring_in(600);
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response("opaque-token")));
    backend.push(BackendCall::RequestNew, Ok(token_response(&fresh)));

    let auth = authenticator("profile-1", backend.clone(), MockReloader::new());
    let issued = auth.get_token(false).await.unwrap();

    assert_eq!(issued.value, fresh);
    assert_eq!(backend.count(BackendCall::RequestNew), 1);
}

#[tokio::test]
async fn unreadable_new_token_is_a_parse_error() {
    let backend = MockBackend::new();
    backend.push(BackendCall::RequestNew, Ok(token_response("not-a-jwt")));

    let auth = authenticator("profile-1", backend.clone(), MockReloader::new());
    let err = auth.get_token(true).await.unwrap_err();

    assert!(matches!(err, AuthError::Parse(TokenParseError::Segments(1))));
    assert_eq!(err.kind(), None);
    assert_eq!(
        auth.telemetry()
            .metrics()
            .token_request_failures
            .with_label_values(&["parse"])
            .get(),
        1
    );
}

#[tokio::test]
async fn rotated_api_key_is_reloaded_and_retried() {
    let backend = MockBackend::new();
    let reloader = MockReloader::returning("new-key");
    let token = jwt_expiring_in(3600);
    backend.push(
        BackendCall::ReuseOrFetch,
        Err(BackendError::new("IAM token request failed with status 400 Bad Request")
            .with_backend_error("BXNIM0415E: Provided API key could not be found.")
            .with_status(400)),
    );
    backend.push(BackendCall::ReuseOrFetch, Ok(token_response(&token)));

    let auth = authenticator("old-key", backend.clone(), reloader.clone());
    let issued = auth.get_token(false).await.unwrap();

    assert_eq!(issued.value, token);
    assert!(issued.lifetime_secs > 3590 && issued.lifetime_secs <= 3600);
    assert_eq!(reloader.count(), 1);
    assert_eq!(auth.get_secret().await, "new-key");
    assert_eq!(
        backend.calls(),
        vec![
            (BackendCall::ReuseOrFetch, "old-key".to_string()),
            (BackendCall::ReuseOrFetch, "new-key".to_string()),
        ]
    );
    assert_eq!(backend.count(BackendCall::RequestNew), 0);
}

#[tokio::test]
async fn set_secret_is_used_by_next_call() {
    let backend = MockBackend::new();
    backend.push(BackendCall::RequestNew, Ok(token_response(&jwt_expiring_in(60))));

    let auth = authenticator("profile-1", backend.clone(), MockReloader::new());
    auth.set_secret("profile-2").await;
    auth.get_token(true).await.unwrap();

    assert_eq!(auth.get_secret().await, "profile-2");
    assert_eq!(backend.calls(), vec![(BackendCall::RequestNew, "profile-2".to_string())]);
}

#[tokio::test]
async fn successful_token_updates_gauges() {
    let backend = MockBackend::new();
    backend.push(BackendCall::RequestNew, Ok(token_response(&jwt_expiring_in(900))));

    let auth = authenticator("profile-1", backend, MockReloader::new());
    let issued = auth.get_token(true).await.unwrap();

    let metrics = auth.telemetry().metrics();
    assert_eq!(metrics.token_lifetime_seconds.get(), issued.lifetime_secs as i64);
    assert_eq!(metrics.token_expiry_unix.get(), issued.exp_unix_ts as i64);
    assert_eq!(metrics.token_requests.with_label_values(&["request_new"]).get(), 1);
}

#[tokio::test]
async fn transient_failure_is_classified_other() {
    let backend = MockBackend::new();
    backend.push(
        BackendCall::RequestNew,
        Err(BackendError::new("IAM token request failed: connection refused")),
    );

    let auth = authenticator("profile-1", backend, MockReloader::new());
    let err = auth.get_token(true).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Other));
    assert_eq!(err.reason(), "other");
}
