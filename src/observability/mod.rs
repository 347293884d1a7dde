//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → tracer.rs (correlation.rs allocates an ID, clock.rs starts timing)
//!     → business handler
//!     → tracer.rs (one log event, one OutcomeRecord, response headers)
//!     → metrics.rs (in-memory sink + Prometheus facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → /stats (sink snapshot)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows through every log event of a request
//! - Metrics are cheap (atomic increments)
//! - Every component is injected; nothing here is a hidden global

pub mod clock;
pub mod correlation;
pub mod logging;
pub mod metrics;
pub mod tracer;

pub use clock::{Clock, MonotonicClock};
pub use correlation::{CorrelationAllocator, CorrelationId, UuidAllocator};
pub use metrics::{InMemoryMetricSink, MetricKey, MetricSink, Outcome, OutcomeRecord, StatsSnapshot};
pub use tracer::{
    FixedLabel, RequestContext, RequestDescriptor, RequestTracer, RouteLabeler, TableLabeler,
    CORRELATION_ID_HEADER, RESPONSE_TIME_HEADER, UNMATCHED_LABEL,
};
