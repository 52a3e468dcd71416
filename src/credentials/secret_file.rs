use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::auth::reloader::{CredentialReloader, ReloadError};
use crate::config::identity::AuthType;

pub const SECRET_CONFIG_PATH_ENV: &str = "SECRET_CONFIG_PATH";
pub const CREDENTIALS_FILE_NAME: &str = "ibm-credentials.env";

pub const AUTH_TYPE_KEY: &str = "IBMCLOUD_AUTHTYPE";
pub const API_KEY_KEY: &str = "IBMCLOUD_APIKEY";
pub const PROFILE_ID_KEY: &str = "IBMCLOUD_PROFILEID";

/// Loads the root credential from an env-style credentials file, usually a
/// mounted Kubernetes secret that is rewritten when the credential rotates.
#[derive(Debug, Clone)]
pub struct SecretFileReloader {
    path: PathBuf,
    auth_type: AuthType,
}

impl SecretFileReloader {
    pub fn new(path: impl Into<PathBuf>, auth_type: AuthType) -> Self {
        Self {
            path: path.into(),
            auth_type,
        }
    }

    /// `$SECRET_CONFIG_PATH/ibm-credentials.env`
    pub fn from_env(auth_type: AuthType) -> Result<Self, ReloadError> {
        let dir = std::env::var(SECRET_CONFIG_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ReloadError::SecretConfigPathUndefined)?;
        Ok(Self::new(Path::new(&dir).join(CREDENTIALS_FILE_NAME), auth_type))
    }

    /// Configured path if any, else the environment.
    pub fn resolve(configured: Option<&str>, auth_type: AuthType) -> Result<Self, ReloadError> {
        match configured {
            Some(path) => Ok(Self::new(path, auth_type)),
            None => Self::from_env(auth_type),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialReloader for SecretFileReloader {
    async fn reload(&self) -> Result<String, ReloadError> {
        info!(path = %self.path.display(), "reading credentials");
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ReloadError::CredentialsUndefined(format!("{}: {}", self.path.display(), e))
        })?;

        let entries = parse_env_file(&content)?;
        let secret = select_credential(&entries, self.auth_type)?;
        debug!(auth_type = self.auth_type.as_str(), "credentials loaded");
        Ok(secret)
    }
}

/// Parses `KEY=VALUE` lines; blank lines and `#` comments are skipped,
/// `export ` prefixes and matching quotes around values are stripped.
pub fn parse_env_file(content: &str) -> Result<HashMap<String, String>, ReloadError> {
    let mut entries = HashMap::new();

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ReloadError::InvalidFormat(format!("line {} has no '='", idx + 1)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ReloadError::InvalidFormat(format!("line {} has an empty key", idx + 1)));
        }

        entries.insert(key.to_owned(), unquote(value.trim()).to_owned());
    }

    Ok(entries)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Picks the credential matching `auth_type` out of the parsed entries.
pub fn select_credential(
    entries: &HashMap<String, String>,
    auth_type: AuthType,
) -> Result<String, ReloadError> {
    if entries.is_empty() {
        return Err(ReloadError::CredentialsUndefined("credentials file is empty".to_string()));
    }

    let declared = non_empty(entries, AUTH_TYPE_KEY).ok_or(ReloadError::AuthTypeUndefined)?;
    let found = AuthType::from_credentials_auth_type(declared)
        .ok_or_else(|| ReloadError::UnknownCredentialType(declared.to_owned()))?;
    if found != auth_type {
        return Err(ReloadError::AuthTypeMismatch {
            expected: auth_type.credentials_auth_type().to_owned(),
            found: declared.to_owned(),
        });
    }

    match auth_type {
        AuthType::ComputeIdentity => non_empty(entries, PROFILE_ID_KEY)
            .map(str::to_owned)
            .ok_or(ReloadError::ProfileIdNotProvided),
        AuthType::ApiKey => non_empty(entries, API_KEY_KEY)
            .map(str::to_owned)
            .ok_or(ReloadError::ApiKeyNotProvided),
    }
}

fn non_empty<'a>(entries: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    entries.get(key).map(String::as_str).filter(|v| !v.is_empty())
}
