use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("SECRET_CONFIG_PATH is not defined")]
    SecretConfigPathUndefined,

    #[error("ibmcloud credentials undefined: {0}")]
    CredentialsUndefined(String),

    #[error("ibmcloud credentials are provided in invalid format, unable to parse the credentials: {0}")]
    InvalidFormat(String),

    #[error("IBMCLOUD_AUTHTYPE undefined")]
    AuthTypeUndefined,

    #[error("Unknown IBMCLOUD_AUTHTYPE provided. IBMCLOUD_AUTHTYPE: {0}")]
    UnknownCredentialType(String),

    #[error("credentials are of type '{found}' but '{expected}' is configured")]
    AuthTypeMismatch { expected: String, found: String },

    #[error("API key is not provided")]
    ApiKeyNotProvided,

    #[error("Profile ID is not provided")]
    ProfileIdNotProvided,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Re-reads the root credential from its backing store.
pub trait CredentialReloader: Send + Sync {
    fn reload(&self) -> impl Future<Output = Result<String, ReloadError>> + Send;
}

impl<T: CredentialReloader> CredentialReloader for Arc<T> {
    fn reload(&self) -> impl Future<Output = Result<String, ReloadError>> + Send {
        (**self).reload()
    }
}
