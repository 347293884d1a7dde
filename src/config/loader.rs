//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "MESHGATE_";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: '{value}'")]
    Env { var: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// `MESHGATE_*` environment overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    finish(config, |key| std::env::var(key).ok())
}

/// Build configuration from defaults plus environment overrides only.
pub fn config_from_env() -> Result<GatewayConfig, ConfigError> {
    finish(GatewayConfig::default(), |key| std::env::var(key).ok())
}

fn finish<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment values onto `config`.
///
/// `lookup` receives the full variable name (including [`ENV_PREFIX`]).
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        let var = format!("{}{}", ENV_PREFIX, name);
        lookup(&var).map(|value| (var, value))
    };

    if let Some((_, v)) = get("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some((_, v)) = get("SERVICE_NAME") {
        config.service.name = v;
    }
    if let Some((_, v)) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some((_, v)) = get("LOG_FORMAT") {
        config.observability.log_format = v;
    }
    if let Some((_, v)) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }
    if let Some((var, v)) = get("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_bool(var, v)?;
    }
    if let Some((var, v)) = get("RATE_LIMITING") {
        config.features.rate_limiting = parse_bool(var, v)?;
    }
    if let Some((var, v)) = get("CACHING") {
        config.features.caching = parse_bool(var, v)?;
    }
    if let Some((var, v)) = get("PROBE_TIMEOUT_MS") {
        config.health_check.timeout_ms = v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value: v })?;
    }

    Ok(())
}

fn parse_bool(var: String, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env { var, value }),
    }
}
