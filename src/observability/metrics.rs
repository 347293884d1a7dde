//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count request outcomes per (route label, status)
//! - Fold durations into a fixed-bucket histogram per key
//! - Provide point-in-time snapshots for scraping
//! - Mirror every record into the `metrics` facade for Prometheus
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_upstream_up` (gauge): 1=reachable, 0=unreachable
//!
//! # Design Decisions
//! - The sink is an injected component, never a module-level singleton
//! - Low-overhead updates: atomics inside `DashMap` entries, so an
//!   existing key is updated under a shared shard guard
//! - Histogram buckets tuned for typical web latencies

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use serde::Serialize;

/// Upper bounds (seconds) of the duration histogram; the last bucket is +Inf.
pub const DURATION_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const BUCKET_COUNT: usize = DURATION_BUCKETS.len() + 1;

/// Request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the tracer reports once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub route_label: String,
    pub status: Outcome,
    pub duration: Duration,
}

/// Dimension of the sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub route_label: String,
    pub status: Outcome,
}

impl MetricKey {
    pub fn new(route_label: impl Into<String>, status: Outcome) -> Self {
        Self {
            route_label: route_label.into(),
            status,
        }
    }
}

/// Aggregate statistics for one key at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub count: u64,
    pub total_micros: u64,
    /// Per-bucket (non-cumulative) counts aligned with [`DURATION_BUCKETS`] plus +Inf.
    pub buckets: Vec<u64>,
}

impl StatsSnapshot {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.total_micros / self.count)
    }
}

/// Destination for outcome records.
///
/// Implementations must tolerate concurrent callers and must never fail or
/// block the request path.
pub trait MetricSink: Send + Sync {
    fn record(&self, outcome: OutcomeRecord);

    fn snapshot(&self) -> BTreeMap<MetricKey, StatsSnapshot>;
}

#[derive(Debug)]
struct KeyStats {
    count: AtomicU64,
    total_micros: AtomicU64,
    buckets: [AtomicU64; BUCKET_COUNT],
}

impl Default for KeyStats {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_micros: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl KeyStats {
    fn observe(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.buckets[bucket_index(duration)].fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> StatsSnapshot {
        StatsSnapshot {
            count: self.count.load(Ordering::Relaxed),
            total_micros: self.total_micros.load(Ordering::Relaxed),
            buckets: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
        }
    }
}

fn bucket_index(duration: Duration) -> usize {
    let secs = duration.as_secs_f64();
    DURATION_BUCKETS
        .iter()
        .position(|bound| secs <= *bound)
        .unwrap_or(DURATION_BUCKETS.len())
}

/// Process-lifetime in-memory sink.
#[derive(Debug, Default)]
pub struct InMemoryMetricSink {
    stats: DashMap<MetricKey, KeyStats>,
}

impl InMemoryMetricSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricSink for InMemoryMetricSink {
    fn record(&self, outcome: OutcomeRecord) {
        let key = MetricKey::new(outcome.route_label, outcome.status);

        metrics::counter!(
            "gateway_requests_total",
            "route" => key.route_label.clone(),
            "status" => key.status.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "gateway_request_duration_seconds",
            "route" => key.route_label.clone(),
            "status" => key.status.as_str()
        )
        .record(outcome.duration.as_secs_f64());

        // Fast path: shared guard on an existing key.
        if let Some(stats) = self.stats.get(&key) {
            stats.observe(outcome.duration);
            return;
        }
        self.stats.entry(key).or_default().observe(outcome.duration);
    }

    fn snapshot(&self) -> BTreeMap<MetricKey, StatsSnapshot> {
        self.stats
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load()))
            .collect()
    }
}

/// Record the reachability of an upstream service.
pub fn record_upstream_health(service: &str, reachable: bool) {
    metrics::gauge!("gateway_upstream_up", "service" => service.to_string())
        .set(if reachable { 1.0 } else { 0.0 });
}

/// Errors that can occur during exporter initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install metrics exporter: {0}")]
    Install(#[from] BuildError),
}

/// Install the Prometheus exporter with its own HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime, once per process.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("gateway_request_duration_seconds".to_string()),
            &DURATION_BUCKETS,
        )?
        .install()?;

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}
