// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use tracing::info_span;

use crate::auth::authenticator::IdentityAuthenticator;
use crate::auth::backend::{AuthBackend, BackendCall, TokenResponse};
use crate::auth::error::BackendError;
use crate::auth::reloader::{CredentialReloader, ReloadError};
use crate::helpers::time::now_i64;
use crate::observability::metrics::Metrics;
use crate::observability::telemetry::Telemetry;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Unsigned JWT carrying only `exp`.
pub fn jwt_with_exp(exp: i64) -> String {
    format!(
        "{}.{}.c2ln",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(json!({"iam_id": "iam-Profile-test", "exp": exp}).to_string())
    )
}

pub fn jwt_expiring_in(secs: i64) -> String {
    jwt_with_exp(now_i64() + secs)
}

pub fn token_response(access_token: &str) -> TokenResponse {
    TokenResponse::new(access_token)
}

pub fn test_telemetry() -> Telemetry {
    Telemetry::new(info_span!("identity", name = "test"), Metrics::new().unwrap())
}

pub fn authenticator(
    secret: &str,
    backend: Arc<MockBackend>,
    reloader: Arc<MockReloader>,
) -> IdentityAuthenticator<Arc<MockBackend>, Arc<MockReloader>> {
    IdentityAuthenticator::new(secret, backend, reloader, test_telemetry())
}

type Scripted = Result<TokenResponse, BackendError>;

/// Backend answering from per-call scripts and recording the secrets it saw.
#[derive(Default)]
pub struct MockBackend {
    reuse: Mutex<VecDeque<Scripted>>,
    fresh: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(BackendCall, String)>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn push(&self, call: BackendCall, result: Scripted) {
        let queue = match call {
            BackendCall::ReuseOrFetch => &self.reuse,
            BackendCall::RequestNew => &self.fresh,
        };
        queue.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<(BackendCall, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: BackendCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|(c, _)| *c == call).count()
    }

    async fn answer(&self, call: BackendCall, secret: &str) -> Scripted {
        self.calls.lock().unwrap().push((call, secret.to_owned()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queue = match call {
            BackendCall::ReuseOrFetch => &self.reuse,
            BackendCall::RequestNew => &self.fresh,
        };
        let next = queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(BackendError::new(format!("no scripted answer for {}", call.as_str()))))
    }
}

impl AuthBackend for MockBackend {
    async fn reuse_or_fetch(&self, secret: &str) -> Result<TokenResponse, BackendError> {
        self.answer(BackendCall::ReuseOrFetch, secret).await
    }

    async fn request_new(&self, secret: &str) -> Result<TokenResponse, BackendError> {
        self.answer(BackendCall::RequestNew, secret).await
    }
}

/// Reloader returning scripted credentials; counts its calls.
#[derive(Default)]
pub struct MockReloader {
    results: Mutex<VecDeque<Result<String, ReloadError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockReloader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn returning(secret: &str) -> Arc<Self> {
        let reloader = Self::default();
        reloader.push(Ok(secret.to_owned()));
        Arc::new(reloader)
    }

    pub fn with_delay(secret: &str, delay: Duration) -> Arc<Self> {
        let reloader = Self {
            delay: Some(delay),
            ..Default::default()
        };
        reloader.push(Ok(secret.to_owned()));
        Arc::new(reloader)
    }

    pub fn push(&self, result: Result<String, ReloadError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialReloader for MockReloader {
    async fn reload(&self) -> Result<String, ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ReloadError::Unavailable("no scripted credential".to_string())))
    }
}
