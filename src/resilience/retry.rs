use tracing::{error, info, warn};

use crate::auth::authenticator::IdentityAuthenticator;
use crate::auth::backend::{AuthBackend, BackendCall, TokenResponse};
use crate::auth::classifier::ErrorClassifier;
use crate::auth::error::{AuthError, BackendError};
use crate::auth::reloader::CredentialReloader;

/// Credential retry policy: one reload and one repeated call, at most.
///
/// Only failures the classifier ties to the root credential are retried.
/// Everything else, including network outages, is returned untouched so a
/// useless reload never hides the real cause.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    classifier: ErrorClassifier,
}

impl RetryPolicy {
    pub fn new(classifier: ErrorClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Classifies a failure that gets no retry cycle.
    pub fn terminal(&self, error: BackendError) -> AuthError {
        AuthError::classified(self.classifier.classify(&error), error)
    }

    /// Handles a failed `call`: reloads the credential and repeats the call
    /// once when the failure is credential related, otherwise returns it.
    pub async fn retry<B, R>(
        &self,
        authenticator: &IdentityAuthenticator<B, R>,
        call: BackendCall,
        error: BackendError,
    ) -> Result<TokenResponse, AuthError>
    where
        B: AuthBackend,
        R: CredentialReloader,
    {
        let kind = self.classifier.classify(&error);
        if !kind.is_retryable() {
            warn!(call = call.as_str(), kind = %kind, "error is not credential related, not retrying");
            return Err(AuthError::classified(kind, error));
        }

        info!(call = call.as_str(), kind = %kind, "credential rejected, reloading credentials and retrying once");
        let secret = authenticator.reload_secret().await.inspect_err(|err| {
            error!(error = %err, "failed to reload credentials");
        })?;

        authenticator
            .call_backend(call, &secret)
            .await
            .inspect(|_| info!(call = call.as_str(), "retry with reloaded credentials succeeded"))
            .map_err(|retry_error| {
                let kind = self.classifier.classify(&retry_error);
                error!(call = call.as_str(), kind = %kind, error = %retry_error, "retry with reloaded credentials failed");
                AuthError::classified(kind, retry_error)
            })
    }
}
