//! IAM authentication backend.
//!
//! Exchanges the root credential for an access token at
//! `{iam_url}/identity/token`:
//! - `compute_identity`: trusted profile id + compute resource (CR) token
//!   read from the projected service account token file
//! - `api_key`: API key grant
//!
//! `reuse_or_fetch` hands out the last token while it is outside its refresh
//! window (the last 20% of its lifetime) and was issued for the same secret.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use http::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::backend::{AuthBackend, TokenResponse};
use crate::auth::error::BackendError;
use crate::config::identity::{AuthType, IdentityConfig};
use crate::helpers::time::now_i64;
use crate::parser::inspector::expiry_of;
use crate::utils::constants::DEFAULT_REQUEST_TIMEOUT_MS;

pub const TOKEN_PATH: &str = "/identity/token";
pub const CR_TOKEN_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:cr-token";
pub const API_KEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
pub const DEFAULT_CR_TOKEN_PATHS: [&str; 2] = [
    "/var/run/secrets/tokens/vault-token",
    "/var/run/secrets/tokens/sa-token",
];
pub const ERR_EMPTY_TOKEN_RESPONSE: &str = "Empty token response received";

/// share of the lifetime after which a cached token is refreshed
const REFRESH_WINDOW_RATIO: f64 = 0.2;

#[derive(Debug, Deserialize)]
struct IamErrorBody {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    secret: String,
    response: TokenResponse,
    refresh_at: i64,
}

#[derive(Debug, Clone)]
pub struct IamBackend {
    client: Client,
    token_url: String,
    auth_type: AuthType,
    cr_token_paths: Vec<PathBuf>,
    cache: Arc<RwLock<Option<CachedResponse>>>,
}

impl IamBackend {
    pub fn new(client: Client, iam_url: &str, auth_type: AuthType) -> Self {
        Self {
            client,
            token_url: format!("{}{}", iam_url.trim_end_matches('/'), TOKEN_PATH),
            auth_type,
            cr_token_paths: DEFAULT_CR_TOKEN_PATHS.iter().map(PathBuf::from).collect(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Reads the CR token from `path` only, no fallbacks.
    pub fn with_cr_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cr_token_paths = vec![path.into()];
        self
    }

    pub fn from_config(identity: &IdentityConfig) -> Result<Self> {
        let timeout = identity.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout))
            .build()?;

        let backend = Self::new(client, &identity.iam_url, identity.auth_type);
        Ok(match &identity.cr_token_path {
            Some(path) => backend.with_cr_token_path(path),
            None => backend,
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn fetch(&self, secret: &str) -> Result<TokenResponse, BackendError> {
        let form = self.grant_form(secret).await?;
        debug!(url = %self.token_url, auth_type = self.auth_type.as_str(), "requesting IAM token");

        let response = self
            .client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                BackendError::new(format!("IAM token request failed: {}", e))
                    .with_action("Check connectivity to the IAM endpoint")
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            BackendError::new(format!("failed to read IAM response: {}", e)).with_status(status.as_u16())
        })?;

        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            BackendError::new(format!("failed to parse IAM token response: {}", e)).with_status(status.as_u16())
        })?;

        if token_response.access_token.trim().is_empty() {
            return Err(BackendError::new(ERR_EMPTY_TOKEN_RESPONSE).with_status(status.as_u16()));
        }

        info!(expires_in = ?token_response.expires_in, "IAM token issued");
        Ok(token_response)
    }

    async fn grant_form(&self, secret: &str) -> Result<Vec<(&'static str, String)>, BackendError> {
        match self.auth_type {
            AuthType::ComputeIdentity => {
                let cr_token = self.read_cr_token().await?;
                Ok(vec![
                    ("grant_type", CR_TOKEN_GRANT_TYPE.to_owned()),
                    ("cr_token", cr_token),
                    ("profile_id", secret.to_owned()),
                ])
            }
            AuthType::ApiKey => Ok(vec![
                ("grant_type", API_KEY_GRANT_TYPE.to_owned()),
                ("apikey", secret.to_owned()),
                ("response_type", "cloud_iam".to_owned()),
            ]),
        }
    }

    async fn read_cr_token(&self) -> Result<String, BackendError> {
        for path in &self.cr_token_paths {
            match tokio::fs::read_to_string(path).await {
                Ok(content) if !content.trim().is_empty() => return Ok(content.trim().to_owned()),
                Ok(_) => warn!(path = %path.display(), "compute resource token file is empty"),
                Err(e) => debug!(path = %path.display(), error = %e, "compute resource token not readable"),
            }
        }
        Err(BackendError::new("unable to read compute resource token")
            .with_backend_error(format!("no readable token at {}", display_paths(&self.cr_token_paths)))
            .with_action("Mount a projected service account token for the workload"))
    }

    async fn cached(&self, secret: &str, now: i64) -> Option<TokenResponse> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.secret == secret && now < cached.refresh_at)
            .map(|cached| cached.response.clone())
    }

    async fn store(&self, secret: &str, response: &TokenResponse) {
        let refresh_at = refresh_at(response, now_i64());
        *self.cache.write().await = Some(CachedResponse {
            secret: secret.to_owned(),
            response: response.clone(),
            refresh_at,
        });
    }
}

impl AuthBackend for IamBackend {
    async fn reuse_or_fetch(&self, secret: &str) -> Result<TokenResponse, BackendError> {
        if let Some(response) = self.cached(secret, now_i64()).await {
            debug!("reusing cached IAM token");
            return Ok(response);
        }
        self.request_new(secret).await
    }

    async fn request_new(&self, secret: &str) -> Result<TokenResponse, BackendError> {
        let response = self.fetch(secret).await?;
        self.store(secret, &response).await;
        Ok(response)
    }
}

/// Unix time after which the cached response is no longer handed out.
fn refresh_at(response: &TokenResponse, now: i64) -> i64 {
    let expiration = response
        .expiration
        .or_else(|| response.expires_in.map(|ttl| now.saturating_add(ttl)))
        .or_else(|| expiry_of(&response.access_token).ok());

    match expiration {
        Some(expiration) => {
            let ttl = response
                .expires_in
                .unwrap_or_else(|| expiration.saturating_sub(now))
                .max(0);
            expiration.saturating_sub((ttl as f64 * REFRESH_WINDOW_RATIO) as i64)
        }
        // unknown lifetime, never reuse
        None => now,
    }
}

fn error_from_response(status: reqwest::StatusCode, body: &str) -> BackendError {
    let description = format!("IAM token request failed with status {}", status);
    let backend_error = match serde_json::from_str::<IamErrorBody>(body) {
        Ok(IamErrorBody { error_message: Some(message), error_code }) => match error_code {
            Some(code) => format!("{}: {}", code, message),
            None => message,
        },
        _ => body.trim().to_owned(),
    };
    BackendError::new(description)
        .with_backend_error(backend_error)
        .with_status(status.as_u16())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
