//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Own health (endpoints.rs):
//!     GET /healthz, GET /readyz → {status, service, version}
//!
//! Upstream health (probe.rs):
//!     GatewayRouter::aggregate_health
//!     → one HealthProbe::check per service, each under its own deadline
//!     → Succeeded | Failed(Timeout) | Failed(Connection) | Failed(Status)
//! ```
//!
//! # Design Decisions
//! - Probes are terminal: no retries within one aggregation
//! - The HTTP client is a trait so tests can script upstreams

pub mod endpoints;
pub mod probe;

pub use endpoints::{healthz, readyz, HealthStatus};
pub use probe::{HealthProbe, HttpProbe, ProbeFailure};
