//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates:
//!   * settings: refresh timing, safety margin, server, metrics, logging
//!   * identity: IAM url, credential and CR token paths
//!   * sinks: absolute file path, http path and collisions with metrics

use std::path::Path;
use tracing::{error, info};

use crate::config::identity::{AuthType, IdentityConfig};
use crate::config::settings::{RefreshConfig, SettingsConfig};
use crate::config::sinks::SinksConfig;
use crate::config::types::ServiceConfig;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_identity(&cfg.identity, &mut errors);
    validate_sinks(&cfg.sinks, &cfg.settings, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for err in &errors {
            error!("config validation: {}", err);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(refresh) = &settings.refresh {
        validate_refresh("settings.refresh", refresh, errors);
    }

    // safety margin sane bounds
    if let Some(s) = settings.safety_margin_seconds {
        if s > 60 * 60 * 24 {
            errors.push(format!(
                "settings.safety_margin_seconds ({}) is unreasonably large",
                s
            ));
        }
    }

    if let Some(server) = &settings.server {
        if server.host.is_empty() {
            errors.push("settings.server.host must not be empty".to_string());
        }
        if server.port.parse::<u16>().is_err() {
            errors.push(format!(
                "settings.server.port '{}' must be an integer in range 0-65535",
                server.port
            ));
        }
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }
    if metrics.is_enabled && settings.server.is_none() {
        errors.push("settings.metrics.is_enabled requires settings.server".to_string());
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_refresh(path: &str, refresh: &RefreshConfig, errors: &mut Vec<String>) {
    if refresh.timeout_ms == Some(0) {
        errors.push(format!("{}.timeout_ms must be > 0", path));
    }
    if refresh.base_delay_ms == Some(0) {
        errors.push(format!("{}.base_delay_ms must be > 0", path));
    }
    if let (Some(base), Some(max)) = (refresh.base_delay_ms, refresh.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

fn validate_identity(identity: &IdentityConfig, errors: &mut Vec<String>) {
    if identity.name.trim().is_empty() {
        errors.push("identity.name must not be empty".to_string());
    }

    if !(identity.iam_url.starts_with("http://") || identity.iam_url.starts_with("https://")) {
        errors.push(format!(
            "identity.iam_url '{}' must start with http:// or https://",
            identity.iam_url
        ));
    }

    if identity.request_timeout_ms == Some(0) {
        errors.push("identity.request_timeout_ms must be > 0".to_string());
    }

    if let Some(p) = &identity.credentials_path {
        if !Path::new(p).is_absolute() {
            errors.push(format!("identity.credentials_path '{}' must be an absolute path", p));
        }
    }

    match (&identity.cr_token_path, identity.auth_type) {
        (Some(p), AuthType::ComputeIdentity) if !Path::new(p).is_absolute() => {
            errors.push(format!("identity.cr_token_path '{}' must be an absolute path", p));
        }
        (Some(_), AuthType::ApiKey) => {
            errors.push("identity.cr_token_path is only valid for auth_type 'compute_identity'".to_string());
        }
        _ => {}
    }
}

fn validate_sinks(sinks: &SinksConfig, settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(file) = &sinks.file {
        if !Path::new(&file.path).is_absolute() {
            errors.push(format!("sinks.file.path '{}' must be an absolute path", file.path));
        }
    }

    if let Some(http) = &sinks.http {
        if !http.path.starts_with('/') {
            errors.push(format!("sinks.http.path '{}' must start with '/'", http.path));
        }
        if settings.metrics.is_enabled && http.path == settings.metrics.path {
            errors.push(format!(
                "sinks.http.path '{}' collides with settings.metrics.path",
                http.path
            ));
        }
        if settings.server.is_none() {
            errors.push("sinks.http requires settings.server".to_string());
        }
    }
}
