//! Backend error classification.
//!
//! The IAM service reports a rotated or revoked root credential only through
//! its error message, so classification is a substring table. Matching is
//! case-insensitive: IAM capitalizes the messages ("Provided API key could
//! not be found.").

use crate::auth::error::{BackendError, ErrorKind};

pub const API_KEY_NOT_FOUND: &str = "api key could not be found";
pub const USER_NOT_FOUND: &str = "user not found or active";
pub const PROFILE_NOT_ELIGIBLE: &str = "selected trusted profile not eligible for cr token";

/// Built-in `{substring -> kind}` mapping.
pub const DEFAULT_RULES: &[(&str, ErrorKind)] = &[
    (API_KEY_NOT_FOUND, ErrorKind::NotFound),
    (USER_NOT_FOUND, ErrorKind::NotFound),
    (PROFILE_NOT_ELIGIBLE, ErrorKind::CredentialInvalid),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    rules: Vec<(String, ErrorKind)>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        DEFAULT_RULES
            .iter()
            .fold(Self::empty(), |classifier, (substring, kind)| classifier.with_rule(*substring, *kind))
    }
}

impl ErrorClassifier {
    /// A classifier that maps everything to [`ErrorKind::Other`].
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, substring: impl Into<String>, kind: ErrorKind) -> Self {
        let substring = substring.into().to_lowercase();
        if !substring.is_empty() {
            self.rules.push((substring, kind));
        }
        self
    }

    pub fn rules(&self) -> &[(String, ErrorKind)] {
        &self.rules
    }

    /// First matching rule wins.
    pub fn classify_message(&self, message: &str) -> ErrorKind {
        let message = message.to_lowercase();
        self.rules
            .iter()
            .find(|(substring, _)| message.contains(substring.as_str()))
            .map(|(_, kind)| *kind)
            .unwrap_or(ErrorKind::Other)
    }

    pub fn classify(&self, error: &BackendError) -> ErrorKind {
        self.classify_message(&error.to_string())
    }
}
