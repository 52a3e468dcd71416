use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::token::Token;

/// Latest token issued by the refresh agent, shared with the sinks.
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    inner: Arc<RwLock<Option<Token>>>,
}

impl TokenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: Token) {
        *self.inner.write().await = Some(token);
    }

    /// Get token if it exists and is not expired
    pub async fn get(&self) -> Option<Token> {
        self.inner
            .read()
            .await
            .as_ref()
            .filter(|token| !token.is_expired())
            .cloned()
    }

    pub async fn clear(&self) -> Option<Token> {
        self.inner.write().await.take()
    }
}
