use serde::{Deserialize, Serialize};

use crate::cache::token::Token;

/// Where the issued token is propagated to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinksConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSinkConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSinkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Absolute filesystem path, rewritten atomically on every new token.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    /// Relative URL path (e.g., `/token`).
    pub path: String,
}

// used for passing events from the refresh agent to active sinks
#[derive(Clone, Debug)]
pub enum SinkMessage {
    Updated(Token),
    Cleared,
}
