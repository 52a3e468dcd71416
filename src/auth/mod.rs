//! Token acquisition for one workload identity.

pub mod authenticator;
pub mod backend;
pub mod classifier;
pub mod error;
pub mod reloader;

pub use authenticator::IdentityAuthenticator;
pub use backend::{AuthBackend, BackendCall, TokenResponse};
pub use classifier::ErrorClassifier;
pub use error::{AuthError, BackendError, ErrorKind};
pub use reloader::{CredentialReloader, ReloadError};
