//! Route table storage and lookup.
//!
//! # Responsibilities
//! - Store the configured route table in declaration order
//! - Look up the route owning a request path
//! - Render the table for the `/routes` listing
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Longest matching prefix wins; ties go to the earlier entry
//! - Explicit `None` rather than silent default

use serde::Serialize;
use url::Url;

use crate::config::RouteConfig;
use crate::routing::matcher::{Matcher, PathPrefixMatcher};

/// Errors raised while compiling the route table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("route '{prefix}' has an invalid upstream '{upstream}': {reason}")]
    InvalidUpstream {
        prefix: String,
        upstream: String,
        reason: String,
    },
}

/// A compiled route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub path_prefix: String,
    pub service_name: String,
    pub upstream: Url,
    matcher: PathPrefixMatcher,
}

impl RouteEntry {
    pub fn new(path_prefix: impl Into<String>, service_name: impl Into<String>, upstream: Url) -> Self {
        let path_prefix = path_prefix.into();
        let matcher = PathPrefixMatcher::new(path_prefix.clone());
        Self {
            path_prefix,
            service_name: service_name.into(),
            upstream,
            matcher,
        }
    }

    /// True if this route owns `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// One row of the `/routes` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteListing {
    pub path: String,
    pub service: String,
    pub port: Option<u16>,
}

/// The immutable route table.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteEntry>,
}

impl RouteRegistry {
    /// Compile the route table from configuration, preserving order.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RegistryError> {
        let routes = configs
            .iter()
            .map(|config| {
                let upstream =
                    Url::parse(&config.upstream).map_err(|e| RegistryError::InvalidUpstream {
                        prefix: config.path_prefix.clone(),
                        upstream: config.upstream.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(RouteEntry::new(
                    config.path_prefix.clone(),
                    config.service.clone(),
                    upstream,
                ))
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;

        tracing::debug!(route_count = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    /// The configured route table, in declaration order.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Find the route owning `path`.
    pub fn find(&self, path: &str) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;
        for route in self.routes.iter().filter(|r| r.matches(path)) {
            match best {
                Some(b) if b.matcher.specificity() >= route.matcher.specificity() => {}
                _ => best = Some(route),
            }
        }
        best
    }

    /// Table rows for the `/routes` endpoint.
    pub fn listing(&self) -> Vec<RouteListing> {
        self.routes
            .iter()
            .map(|r| RouteListing {
                path: r.path_prefix.clone(),
                service: r.service_name.clone(),
                port: r.upstream.port_or_known_default(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prefix: &str, service: &str, upstream: &str) -> RouteConfig {
        RouteConfig {
            path_prefix: prefix.into(),
            service: service.into(),
            upstream: upstream.into(),
        }
    }

    fn sample() -> RouteRegistry {
        RouteRegistry::from_config(&[
            config("/api/v1/auth", "auth", "http://127.0.0.1:8001"),
            config("/api/v1", "core", "http://127.0.0.1:8000"),
            config("/api/v1/search", "search", "https://search.internal"),
        ])
        .unwrap()
    }

    #[test]
    fn test_preserves_declaration_order() {
        let registry = sample();
        let services: Vec<_> = registry.routes().iter().map(|r| r.service_name.as_str()).collect();
        assert_eq!(services, vec!["auth", "core", "search"]);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let registry = sample();
        assert_eq!(registry.find("/api/v1/auth/login").unwrap().service_name, "auth");
        assert_eq!(registry.find("/api/v1/search/items").unwrap().service_name, "search");
        assert_eq!(registry.find("/api/v1/storage/42").unwrap().service_name, "core");
        assert!(registry.find("/metrics").is_none());
    }

    #[test]
    fn test_listing_reports_ports() {
        let listing = sample().listing();
        assert_eq!(
            listing[0],
            RouteListing {
                path: "/api/v1/auth".into(),
                service: "auth".into(),
                port: Some(8001),
            }
        );
        assert_eq!(listing[2].port, Some(443));
    }

    #[test]
    fn test_invalid_upstream_rejected() {
        let err = RouteRegistry::from_config(&[config("/x", "x", "not a url")]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidUpstream { .. }));
    }
}
