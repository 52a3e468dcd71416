//! # IAM Token Agent Library
//!
//! Obtains and renews a short-lived IAM access token on behalf of one
//! workload identity, using a long-lived root credential (trusted profile id
//! or API key), and exposes the token to sinks and endpoints.
//!
//! Modules:
//! - `auth`: identity authenticator, error taxonomy, backend/reloader seams
//! - `parser`: token lifetime inspection
//! - `resilience`: credential retry policy and refresh backoff
//! - `sources`: IAM HTTP authentication backend
//! - `credentials`: root credential reloading from the secret file
//! - `agent`: periodic refresh loop
//! - `config`: service configuration, loading and validation
//! - `cache`: issued token and shared token state
//! - `sinks`: file and HTTP token propagation

pub mod agent;
pub mod auth;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sinks;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::auth::authenticator::IdentityAuthenticator;
pub use crate::auth::error::{AuthError, BackendError, ErrorKind};
pub use crate::cache::token::Token;
pub use crate::config::types::ServiceConfig;
pub use crate::parser::inspector::check_lifetime;
