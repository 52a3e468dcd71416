//! Token lifetime inspection.
//!
//! Reads the `exp` claim out of a JWT access token without verifying its
//! signature. The token is only inspected to decide whether it can still be
//! handed out; trust is established by the issuer, not here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::helpers::time::now_i64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenParseError {
    #[error("token is empty")]
    Empty,

    #[error("invalid JWT format: expected 3 segments, got {0}")]
    Segments(usize),

    #[error("base64 decode error: {0}")]
    Encoding(String),

    #[error("invalid JWT payload: {0}")]
    Payload(String),

    #[error("JWT has no 'exp' claim")]
    MissingExpiry,

    #[error("JWT 'exp' claim is not a unix timestamp: {0}")]
    InvalidExpiry(String),
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<Value>,
}

/// Remaining validity of `token` in seconds, measured against the system clock.
///
/// Zero means the token has expired; an unreadable token is an error.
pub fn check_lifetime(token: &str) -> Result<u64, TokenParseError> {
    check_lifetime_at(token, now_i64())
}

/// Same as [`check_lifetime`] with an explicit `now` (unix seconds).
pub fn check_lifetime_at(token: &str, now: i64) -> Result<u64, TokenParseError> {
    let exp = expiry_of(token)?;
    Ok(exp.saturating_sub(now).max(0) as u64)
}

/// The `exp` claim of `token` as unix seconds.
pub fn expiry_of(token: &str) -> Result<i64, TokenParseError> {
    let payload = decode_jwt_payload(token)?;
    let claims = serde_json::from_slice::<ExpiryClaims>(&payload)
        .map_err(|e| TokenParseError::Payload(e.to_string()))?;

    match claims.exp {
        None | Some(Value::Null) => Err(TokenParseError::MissingExpiry),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| TokenParseError::InvalidExpiry(n.to_string())),
        Some(other) => Err(TokenParseError::InvalidExpiry(other.to_string())),
    }
}

fn decode_jwt_payload(token: &str) -> Result<Vec<u8>, TokenParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenParseError::Empty);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenParseError::Segments(parts.len()));
    }

    // some issuers keep the padding
    URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| TokenParseError::Encoding(e.to_string()))
}
