use serde::Deserialize;

use crate::config::identity::IdentityConfig;
use crate::config::settings::SettingsConfig;
use crate::config::sinks::SinksConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub sinks: SinksConfig,
}
