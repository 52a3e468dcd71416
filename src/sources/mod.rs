/// Sources module
///
/// Authentication backends the identity authenticator can be wired to.
pub mod iam;

pub use iam::IamBackend;
