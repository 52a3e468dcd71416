use std::time::Duration;

use crate::config::settings::RefreshConfig;
use crate::utils::constants::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS};

/// Delay between failed refresh rounds, doubling up to a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    next_delay_ms: u64,
}

impl Backoff {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        let base_delay_ms = base_delay_ms.max(1);
        let max_delay_ms = max_delay_ms.max(base_delay_ms);
        Self {
            base_delay_ms,
            max_delay_ms,
            next_delay_ms: base_delay_ms,
        }
    }

    pub fn from_config(refresh: Option<&RefreshConfig>) -> Self {
        Self::new(
            refresh.and_then(|r| r.base_delay_ms).unwrap_or(DEFAULT_BASE_DELAY_MS),
            refresh.and_then(|r| r.max_delay_ms).unwrap_or(DEFAULT_MAX_DELAY_MS),
        )
    }

    /// will be multiplied by 2 on every call until max_delay_ms
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next_delay_ms;
        self.next_delay_ms = delay.saturating_mul(2).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    pub fn reset(&mut self) {
        self.next_delay_ms = self.base_delay_ms;
    }
}
