use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::auth::reloader::ReloadError;
use crate::parser::inspector::TokenParseError;

/// Classification of a backend failure; drives retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Root credential rejected, likely rotated externally.
    CredentialInvalid,
    /// Root credential (or the user behind it) unknown to the backend.
    NotFound,
    Other,
}

impl ErrorKind {
    /// Whether a credential reload may resolve the failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::CredentialInvalid | ErrorKind::NotFound)
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            ErrorKind::CredentialInvalid => "credential_invalid",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an authentication backend, before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendError {
    pub description: String,
    /// message returned by the remote service, if any
    pub backend_error: Option<String>,
    /// what the operator can do about it
    pub action: Option<String>,
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_backend_error(mut self, backend_error: impl Into<String>) -> Self {
        self.backend_error = Some(backend_error.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if !self.description.is_empty() {
            parts.push(format!("Description: {}", self.description));
        }
        if let Some(backend_error) = self.backend_error.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("BackendError: {}", backend_error));
        }
        if let Some(action) = self.action.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Action: {}", action));
        }
        f.write_str(&parts.join(" "))
    }
}

impl std::error::Error for BackendError {}

/// Everything `get_token` can fail with.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected by authentication backend: {0}")]
    CredentialInvalid(BackendError),

    #[error("credential not found by authentication backend: {0}")]
    NotFound(BackendError),

    #[error("authentication backend request failed: {0}")]
    Other(BackendError),

    #[error("token lifetime could not be determined: {0}")]
    Parse(#[from] TokenParseError),

    #[error("credential reload failed: {0}")]
    Reload(#[from] ReloadError),
}

impl AuthError {
    pub fn classified(kind: ErrorKind, error: BackendError) -> Self {
        match kind {
            ErrorKind::CredentialInvalid => AuthError::CredentialInvalid(error),
            ErrorKind::NotFound => AuthError::NotFound(error),
            ErrorKind::Other => AuthError::Other(error),
        }
    }

    /// A caller-side deadline that elapsed; never retried.
    pub fn timed_out(after: Duration) -> Self {
        AuthError::Other(
            BackendError::new(format!("token request timed out after {} ms", after.as_millis()))
                .with_action("Check connectivity to the IAM endpoint"),
        )
    }

    /// Backend classification, `None` for parse and reload failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AuthError::CredentialInvalid(_) => Some(ErrorKind::CredentialInvalid),
            AuthError::NotFound(_) => Some(ErrorKind::NotFound),
            AuthError::Other(_) => Some(ErrorKind::Other),
            AuthError::Parse(_) | AuthError::Reload(_) => None,
        }
    }

    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            AuthError::CredentialInvalid(e) | AuthError::NotFound(e) | AuthError::Other(e) => Some(e),
            AuthError::Parse(_) | AuthError::Reload(_) => None,
        }
    }

    /// Label used for the failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Parse(_) => "parse",
            AuthError::Reload(_) => "reload",
            other => other.kind().map(|k| k.as_str()).unwrap_or("other"),
        }
    }
}
