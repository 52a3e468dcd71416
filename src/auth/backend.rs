use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::error::BackendError;

/// Token issued by the authentication backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// lifetime in seconds as announced by the issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// unix timestamp as announced by the issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
}

impl TokenResponse {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// The two kinds of backend call the authenticator issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    ReuseOrFetch,
    RequestNew,
}

impl BackendCall {
    pub fn as_str(&self) -> &'static str {
        match *self {
            BackendCall::ReuseOrFetch => "reuse_or_fetch",
            BackendCall::RequestNew => "request_new",
        }
    }
}

/// Exchanges a root credential for an access token.
pub trait AuthBackend: Send + Sync {
    /// Returns a token the backend still holds for `secret`, fetching one if needed.
    fn reuse_or_fetch(
        &self,
        secret: &str,
    ) -> impl Future<Output = Result<TokenResponse, BackendError>> + Send;

    /// Always asks the issuer for a new token.
    fn request_new(
        &self,
        secret: &str,
    ) -> impl Future<Output = Result<TokenResponse, BackendError>> + Send;
}

impl<T: AuthBackend> AuthBackend for Arc<T> {
    fn reuse_or_fetch(
        &self,
        secret: &str,
    ) -> impl Future<Output = Result<TokenResponse, BackendError>> + Send {
        (**self).reuse_or_fetch(secret)
    }

    fn request_new(
        &self,
        secret: &str,
    ) -> impl Future<Output = Result<TokenResponse, BackendError>> + Send {
        (**self).request_new(secret)
    }
}
