//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }
    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::new("health_check.timeout_ms", "must be > 0"));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }
    if config.features.rate_limiting && config.rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new("rate_limit.requests_per_second", "must be > 0"));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        validate_route(i, route, &mut errors);
        if !seen.insert(route.path_prefix.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                format!("routes[{}].path_prefix", i),
                format!("duplicate prefix '{}'", route.path_prefix),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(index: usize, route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let field = |name: &str| format!("routes[{}].{}", index, name);

    if !route.path_prefix.starts_with('/') {
        errors.push(ValidationError::new(field("path_prefix"), "must start with '/'"));
    }
    if route.service.trim().is_empty() {
        errors.push(ValidationError::new(field("service"), "must not be empty"));
    }
    match Url::parse(&route.upstream) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::new(
                field("upstream"),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::new(field("upstream"), "missing host"));
        }
        Ok(_) => {}
        Err(e) => {
            errors.push(ValidationError::new(field("upstream"), e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str, service: &str, upstream: &str) -> RouteConfig {
        RouteConfig {
            path_prefix: prefix.into(),
            service: service.into(),
            upstream: upstream.into(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.health_check.timeout_ms = 0;
        config.routes.push(route("api", "", "ftp://host"));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"health_check.timeout_ms"));
        assert!(fields.contains(&"routes[0].path_prefix"));
        assert!(fields.contains(&"routes[0].service"));
        assert!(fields.contains(&"routes[0].upstream"));
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut config = GatewayConfig::default();
        config.routes.push(route("/api/auth", "auth", "http://127.0.0.1:8001"));
        config.routes.push(route("/api/auth/", "auth2", "http://127.0.0.1:8002"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("duplicate"));
    }
}
