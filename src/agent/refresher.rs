use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast::Sender;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::auth::authenticator::IdentityAuthenticator;
use crate::auth::backend::AuthBackend;
use crate::auth::error::AuthError;
use crate::auth::reloader::CredentialReloader;
use crate::cache::token_state::TokenState;
use crate::config::settings::SettingsConfig;
use crate::config::sinks::SinkMessage;
use crate::helpers::time::unix_to_rfc3339;
use crate::resilience::backoff::Backoff;
use crate::utils::constants::{DEFAULT_REFRESH_TIMEOUT_MS, DEFAULT_SAFETY_MARGIN_SECS};

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub safety_margin_seconds: u64,
    /// deadline for one `get_token` call
    pub timeout: Duration,
    pub backoff: Backoff,
}

impl RefreshSettings {
    pub fn from_config(settings: &SettingsConfig) -> Self {
        let refresh = settings.refresh.as_ref();
        Self {
            safety_margin_seconds: settings.safety_margin_seconds.unwrap_or(DEFAULT_SAFETY_MARGIN_SECS),
            timeout: Duration::from_millis(
                refresh.and_then(|r| r.timeout_ms).unwrap_or(DEFAULT_REFRESH_TIMEOUT_MS),
            ),
            backoff: Backoff::from_config(refresh),
        }
    }
}

/// Keeps a valid token in [`TokenState`], renewing it ahead of expiry.
pub struct RefreshAgent<B, R> {
    authenticator: Arc<IdentityAuthenticator<B, R>>,
    token_state: TokenState,
    sink_sender: Sender<SinkMessage>,
    safety_margin_seconds: u64,
    timeout: Duration,
    backoff: Backoff,
    force_fresh: bool,
}

impl<B, R> RefreshAgent<B, R>
where
    B: AuthBackend,
    R: CredentialReloader,
{
    pub fn new(
        authenticator: Arc<IdentityAuthenticator<B, R>>,
        token_state: TokenState,
        settings: RefreshSettings,
        sink_sender: Sender<SinkMessage>,
    ) -> Self {
        Self {
            authenticator,
            token_state,
            sink_sender,
            safety_margin_seconds: settings.safety_margin_seconds,
            timeout: settings.timeout,
            backoff: settings.backoff,
            force_fresh: false,
        }
    }

    /// Whether the next round bypasses the backend's cached token.
    pub fn force_fresh(&self) -> bool {
        self.force_fresh
    }

    /// One refresh round; returns how long to wait before the next one.
    pub async fn refresh_once(&mut self) -> Duration {
        let result = timeout(self.timeout, self.authenticator.get_token(self.force_fresh))
            .await
            .unwrap_or_else(|_| Err(AuthError::timed_out(self.timeout)));

        match result {
            Ok(token) => {
                self.backoff.reset();
                let lifetime = token.lifetime_secs;
                // a token already inside the margin must not be served from cache again
                self.force_fresh = lifetime <= self.safety_margin_seconds;

                info!(
                    lifetime,
                    expires_at = %unix_to_rfc3339(token.exp_unix_ts),
                    "token refreshed"
                );
                self.token_state.set(token.clone()).await;
                let _ = self
                    .sink_sender
                    .send(SinkMessage::Updated(token))
                    .inspect_err(|_| debug!("no active sink receivers"));

                Duration::from_secs(lifetime.saturating_sub(self.safety_margin_seconds).max(1))
            }
            Err(err) => {
                error!(error = %err, reason = err.reason(), "token refresh failed");
                self.force_fresh = true;

                if self.token_state.get().await.is_none() && self.token_state.clear().await.is_some() {
                    warn!("held token has expired, clearing sinks");
                    let _ = self.sink_sender.send(SinkMessage::Cleared);
                }
                self.backoff.next_delay()
            }
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("refresh agent started");
        loop {
            let sleep_for = self.refresh_once().await;
            info!("next refresh in {} ms", sleep_for.as_millis());
            tokio::time::sleep(sleep_for).await;
        }
    }
}
