use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};

use crate::auth::backend::{AuthBackend, BackendCall, TokenResponse};
use crate::auth::error::{AuthError, BackendError};
use crate::auth::reloader::{CredentialReloader, ReloadError};
use crate::cache::token::Token;
use crate::helpers::time::get_instant;
use crate::observability::telemetry::Telemetry;
use crate::parser::inspector::check_lifetime;
use crate::resilience::retry::RetryPolicy;

static OK_MSG: &str = "ok";
static ERROR_MSG: &str = "error";

/// Obtains access tokens for one workload identity.
///
/// Holds the root credential (trusted profile id or API key) and drives the
/// authentication backend, the token inspector and the retry policy. Safe to
/// share between tasks; the credential is the only mutable state and sits
/// behind a lock that is held for the whole reload.
pub struct IdentityAuthenticator<B, R> {
    secret: Mutex<String>,
    backend: B,
    reloader: R,
    retry_policy: RetryPolicy,
    telemetry: Telemetry,
}

impl<B, R> IdentityAuthenticator<B, R>
where
    B: AuthBackend,
    R: CredentialReloader,
{
    pub fn new(secret: impl Into<String>, backend: B, reloader: R, telemetry: Telemetry) -> Self {
        telemetry.span().in_scope(|| info!("Initialized identity authenticator"));
        Self {
            secret: Mutex::new(secret.into()),
            backend,
            reloader,
            retry_policy: RetryPolicy::default(),
            telemetry,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a validated token and its remaining lifetime.
    ///
    /// With `force_fresh == false` the backend may hand back a token it still
    /// holds; a cached token that is expired or unreadable is never returned,
    /// a new one is requested instead.
    pub async fn get_token(&self, force_fresh: bool) -> Result<Token, AuthError> {
        self.fetch_token(force_fresh)
            .instrument(self.telemetry.span().clone())
            .await
            .inspect(|token| {
                let metrics = self.telemetry.metrics();
                metrics.token_lifetime_seconds.set(token.lifetime_secs as i64);
                metrics.token_expiry_unix.set(token.exp_unix_ts as i64);
            })
            .inspect_err(|err| {
                self.telemetry
                    .metrics()
                    .token_request_failures
                    .with_label_values(&[err.reason()])
                    .inc();
            })
    }

    async fn fetch_token(&self, force_fresh: bool) -> Result<Token, AuthError> {
        info!(force_fresh, "Fetching token using identity authenticator");
        // one retry cycle per get_token, shared by both paths
        let mut retried = false;

        if !force_fresh {
            debug!("Retrieving existing token");
            let response = self.call_with_retry(BackendCall::ReuseOrFetch, &mut retried).await?;
            match check_lifetime(&response.access_token) {
                Ok(lifetime) if lifetime > 0 => {
                    debug!(lifetime, "existing token is still valid");
                    return Ok(Token::new(response.access_token, lifetime));
                }
                Ok(_) => warn!("existing token has expired, requesting a new one"),
                Err(err) => warn!(error = %err, "existing token lifetime unreadable, requesting a new one"),
            }
        }

        let response = self.call_with_retry(BackendCall::RequestNew, &mut retried).await?;
        let lifetime = check_lifetime(&response.access_token).inspect_err(|err| {
            error!(error = %err, "Error fetching token lifetime");
        })?;

        info!(lifetime, "Successfully fetched IAM token");
        Ok(Token::new(response.access_token, lifetime))
    }

    async fn call_with_retry(
        &self,
        call: BackendCall,
        retried: &mut bool,
    ) -> Result<TokenResponse, AuthError> {
        let secret = self.get_secret().await;
        match self.call_backend(call, &secret).await {
            Ok(response) => Ok(response),
            Err(err) if *retried => {
                error!(call = call.as_str(), error = %err, "Error fetching token, retry already used");
                Err(self.retry_policy.terminal(err))
            }
            Err(err) => {
                error!(call = call.as_str(), error = %err, "Error fetching token");
                *retried = true;
                self.retry_policy.retry(self, call, err).await
            }
        }
    }

    pub(crate) async fn call_backend(
        &self,
        call: BackendCall,
        secret: &str,
    ) -> Result<TokenResponse, BackendError> {
        let metrics = self.telemetry.metrics();
        let start = get_instant();
        metrics.token_requests.with_label_values(&[call.as_str()]).inc();

        let result = match call {
            BackendCall::ReuseOrFetch => self.backend.reuse_or_fetch(secret).await,
            BackendCall::RequestNew => self.backend.request_new(secret).await,
        };

        metrics
            .token_request_duration
            .with_label_values(&[call.as_str()])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    /// Replaces the credential with a freshly loaded one.
    ///
    /// The lock is held across the reload, so concurrent callers never read a
    /// credential that is being replaced. On failure the old value stays.
    pub(crate) async fn reload_secret(&self) -> Result<String, ReloadError> {
        let mut secret = self.secret.lock().await;
        let reloads = &self.telemetry.metrics().credential_reloads;
        match self.reloader.reload().await {
            Ok(reloaded) => {
                if *secret == reloaded {
                    warn!("reloaded credential is unchanged");
                }
                *secret = reloaded.clone();
                reloads.with_label_values(&[OK_MSG]).inc();
                Ok(reloaded)
            }
            Err(err) => {
                reloads.with_label_values(&[ERROR_MSG]).inc();
                Err(err)
            }
        }
    }

    pub async fn get_secret(&self) -> String {
        self.secret.lock().await.clone()
    }

    pub async fn set_secret(&self, secret: impl Into<String>) {
        *self.secret.lock().await = secret.into();
    }
}
