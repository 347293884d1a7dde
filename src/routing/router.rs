//! Gateway route table queries and aggregate upstream health.
//!
//! # Responsibilities
//! - Expose the immutable route table
//! - Fan out one health probe per upstream service and join the results
//!
//! # Design Decisions
//! - Probes run concurrently; total latency tracks the slowest probe
//! - The timeout bounds each probe, not only the whole call
//! - A failing upstream degrades the result, it never fails the call
//! - No retries within a single aggregation

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Serialize, Serializer};
use tokio::time::Instant;
use url::Url;

use crate::health::probe::{HealthProbe, ProbeFailure};
use crate::observability::metrics;
use crate::routing::registry::{RouteEntry, RouteListing, RouteRegistry};

/// Health of one upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    #[serde(rename = "service")]
    pub service_name: String,
    pub reachable: bool,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall verdict across every upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Healthy,
    Degraded,
}

/// Result of [`GatewayRouter::aggregate_health`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateHealth {
    pub status: AggregateStatus,
    pub services: BTreeMap<String, HealthVerdict>,
}

impl AggregateHealth {
    pub fn unreachable(&self) -> impl Iterator<Item = &HealthVerdict> {
        self.services.values().filter(|v| !v.reachable)
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Answers route-table and aggregate-health queries.
pub struct GatewayRouter {
    registry: Arc<RouteRegistry>,
    probe: Arc<dyn HealthProbe>,
}

impl GatewayRouter {
    pub fn new(registry: Arc<RouteRegistry>, probe: Arc<dyn HealthProbe>) -> Self {
        Self { registry, probe }
    }

    pub fn routes(&self) -> &[RouteEntry] {
        self.registry.routes()
    }

    pub fn listing(&self) -> Vec<RouteListing> {
        self.registry.listing()
    }

    /// Probe every distinct upstream service concurrently.
    ///
    /// When a service appears on several routes, its first route's upstream
    /// is probed.
    pub async fn aggregate_health(&self, timeout: Duration) -> AggregateHealth {
        let mut targets: BTreeMap<&str, &Url> = BTreeMap::new();
        for route in self.registry.routes() {
            targets.entry(route.service_name.as_str()).or_insert(&route.upstream);
        }

        let probes = targets
            .into_iter()
            .map(|(service, upstream)| self.probe_one(service, upstream, timeout));
        let verdicts = join_all(probes).await;

        let status = if verdicts.iter().all(|v| v.reachable) {
            AggregateStatus::Healthy
        } else {
            AggregateStatus::Degraded
        };
        let services = verdicts
            .into_iter()
            .map(|v| (v.service_name.clone(), v))
            .collect();

        AggregateHealth { status, services }
    }

    async fn probe_one(&self, service: &str, upstream: &Url, timeout: Duration) -> HealthVerdict {
        let start = Instant::now();
        let result = match tokio::time::timeout(timeout, self.probe.check(upstream)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::Timeout(timeout)),
        };

        let verdict = match result {
            Ok(()) => HealthVerdict {
                service_name: service.to_string(),
                reachable: true,
                latency: start.elapsed(),
                error: None,
            },
            Err(failure) => {
                tracing::warn!(
                    service = %service,
                    upstream = %upstream,
                    error = %failure,
                    "Health probe failed"
                );
                let latency = match failure {
                    ProbeFailure::Status(_) => start.elapsed(),
                    ProbeFailure::Timeout(_) | ProbeFailure::Connection(_) => timeout,
                };
                HealthVerdict {
                    service_name: service.to_string(),
                    reachable: false,
                    latency,
                    error: Some(failure.to_string()),
                }
            }
        };

        metrics::record_upstream_health(service, verdict.reachable);
        verdict
    }
}
