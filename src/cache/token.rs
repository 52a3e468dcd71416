use std::fmt;

use crate::helpers::time::now_u64;

/// An issued bearer token with the lifetime it had when it was inspected.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    /// remaining seconds at inspection time
    pub lifetime_secs: u64,
    pub exp_unix_ts: u64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(value: String, lifetime_secs: u64) -> Self {
        Self {
            value,
            lifetime_secs,
            exp_unix_ts: now_u64().saturating_add(lifetime_secs),
        }
    }

    /// Seconds left before expiry, measured now.
    pub fn remaining_secs(&self) -> u64 {
        self.exp_unix_ts.saturating_sub(now_u64())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_secs() == 0
    }
}

// bearer values stay out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &format_args!("<{} bytes>", self.value.len()))
            .field("lifetime_secs", &self.lifetime_secs)
            .field("exp_unix_ts", &self.exp_unix_ts)
            .finish()
    }
}
