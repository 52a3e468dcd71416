use serde::{Deserialize, Serialize};

use crate::utils::constants::{DEFAULT_IAM_URL, DEFAULT_IDENTITY_NAME};

/// ================================
/// Workload identity
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// label used in logs
    #[serde(default = "default_identity_name")]
    pub name: String,
    pub auth_type: AuthType,
    #[serde(default = "default_iam_url")]
    pub iam_url: String,
    /// env-style credentials file; falls back to `$SECRET_CONFIG_PATH/ibm-credentials.env`
    pub credentials_path: Option<String>,
    /// compute resource token, only used by `compute_identity`
    pub cr_token_path: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

/// Kind of root credential the identity authenticates with.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// trusted profile id exchanged together with a compute resource token
    ComputeIdentity,
    ApiKey,
}

impl AuthType {
    /// `IBMCLOUD_AUTHTYPE` value in the credentials file
    pub fn credentials_auth_type(&self) -> &'static str {
        match *self {
            AuthType::ComputeIdentity => "pod-identity",
            AuthType::ApiKey => "iam",
        }
    }

    pub fn from_credentials_auth_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pod-identity" => Some(AuthType::ComputeIdentity),
            "iam" => Some(AuthType::ApiKey),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            AuthType::ComputeIdentity => "compute_identity",
            AuthType::ApiKey => "api_key",
        }
    }
}

fn default_identity_name() -> String {
    DEFAULT_IDENTITY_NAME.to_string()
}

fn default_iam_url() -> String {
    DEFAULT_IAM_URL.to_string()
}
