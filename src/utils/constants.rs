//! Shared constants and defaults

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 10000;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30000;

pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_IDENTITY_NAME: &str = "workload";
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";
