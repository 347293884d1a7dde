//! Request tracing: correlation, timing and outcome recording.
//!
//! # Responsibilities
//! - Allocate a correlation ID per request
//! - Time the wrapped handler
//! - Emit one structured log event and one outcome record per request
//! - Stamp correlation and timing headers on the response
//!
//! # Design Decisions
//! - Bookkeeping lives in a drop guard, so it runs exactly once on every
//!   exit path: success, error value, cancellation and panic unwinding
//! - Errors are returned to the caller unchanged
//! - Metric labels come from the route table, never the raw path
//! - No lock is held while the handler runs

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Method, Request, Response, StatusCode};
use tracing::Instrument;

use crate::observability::clock::{Clock, MonotonicClock};
use crate::observability::correlation::{CorrelationAllocator, CorrelationId, UuidAllocator};
use crate::observability::metrics::{MetricSink, Outcome, OutcomeRecord};
use crate::routing::RouteRegistry;

/// Response header carrying the correlation ID.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
/// Response header carrying the handler duration, e.g. `12.345ms`.
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";
/// Label used for paths outside the route table.
pub const UNMATCHED_LABEL: &str = "unmatched";

/// Maps a request path to a bounded-cardinality metric label.
pub trait RouteLabeler: Send + Sync {
    fn label(&self, path: &str) -> String;
}

/// Uses one label for every request.
#[derive(Debug, Clone)]
pub struct FixedLabel(pub String);

impl RouteLabeler for FixedLabel {
    fn label(&self, _path: &str) -> String {
        self.0.clone()
    }
}

/// Labels requests with the route-table prefix that owns them.
///
/// Paths listed in `local_paths` (the gateway's own endpoints) keep their
/// exact path; anything else collapses to [`UNMATCHED_LABEL`].
#[derive(Debug, Clone)]
pub struct TableLabeler {
    registry: Arc<RouteRegistry>,
    local_paths: Vec<String>,
}

impl TableLabeler {
    pub fn new(registry: Arc<RouteRegistry>) -> Self {
        Self {
            registry,
            local_paths: Vec::new(),
        }
    }

    pub fn with_local_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local_paths.extend(paths.into_iter().map(Into::into));
        self
    }
}

impl RouteLabeler for TableLabeler {
    fn label(&self, path: &str) -> String {
        if let Some(route) = self.registry.find(path) {
            return route.path_prefix.clone();
        }
        if self.local_paths.iter().any(|p| p == path) {
            return path.to_string();
        }
        UNMATCHED_LABEL.to_string()
    }
}

/// What the tracer needs to know about an inbound request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub client_address: Option<SocketAddr>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            client_address: None,
        }
    }

    pub fn with_client(mut self, addr: SocketAddr) -> Self {
        self.client_address = Some(addr);
        self
    }

    /// Describe an axum request. The client address is taken from
    /// `ConnectInfo` when the server was started with it.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            client_address: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        }
    }
}

/// Per-request context handed to the wrapped handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: CorrelationId,
    pub method: Method,
    pub path: String,
    pub client_address: Option<SocketAddr>,
    pub start: Instant,
}

/// Wraps handler invocations with correlation, timing and metrics.
pub struct RequestTracer {
    allocator: Arc<dyn CorrelationAllocator>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn MetricSink>,
    labeler: Arc<dyn RouteLabeler>,
}

impl RequestTracer {
    pub fn new(sink: Arc<dyn MetricSink>, labeler: Arc<dyn RouteLabeler>) -> Self {
        Self {
            allocator: Arc::new(UuidAllocator),
            clock: Arc::new(MonotonicClock),
            sink,
            labeler,
        }
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn CorrelationAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink(&self) -> &Arc<dyn MetricSink> {
        &self.sink
    }

    /// Run `handler` under tracing.
    ///
    /// `Ok` responses with a 5xx or 408 status count as errors but are still
    /// returned and stamped. `Err` values are recorded and returned unchanged.
    pub async fn trace<F, Fut, B, E>(
        &self,
        request: RequestDescriptor,
        handler: F,
    ) -> Result<Response<B>, E>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<Response<B>, E>>,
        E: fmt::Display,
    {
        let ctx = RequestContext {
            correlation_id: self.allocator.allocate(),
            method: request.method,
            path: request.path,
            client_address: request.client_address,
            start: self.clock.now(),
        };
        let span = tracing::info_span!(
            "request",
            correlation_id = %ctx.correlation_id,
            method = %ctx.method,
            path = %ctx.path,
        );
        let mut guard = TraceGuard {
            tracer: self,
            route_label: self.labeler.label(&ctx.path),
            ctx: ctx.clone(),
            finished: false,
        };

        let result = handler(ctx).instrument(span).await;

        match result {
            Ok(mut response) => {
                let status = response.status();
                let outcome = outcome_for_status(status);
                let duration = guard.finish(outcome, Some(status), None);
                stamp_headers(&mut response, &guard.ctx.correlation_id, duration);
                Ok(response)
            }
            Err(error) => {
                guard.finish(Outcome::Error, None, Some(error.to_string()));
                Err(error)
            }
        }
    }
}

/// Classify a handler's response status.
pub fn outcome_for_status(status: StatusCode) -> Outcome {
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        Outcome::Error
    } else {
        Outcome::Success
    }
}

/// Render a duration for the response-time header.
pub fn format_duration(duration: Duration) -> String {
    format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
}

fn stamp_headers<B>(response: &mut Response<B>, id: &CorrelationId, duration: Duration) {
    let headers = response.headers_mut();
    match HeaderValue::from_str(id.as_str()) {
        Ok(value) => {
            headers.insert(CORRELATION_ID_HEADER, value);
        }
        Err(_) => {
            tracing::warn!(correlation_id = %id, "Correlation id is not a valid header value");
        }
    }
    if let Ok(value) = HeaderValue::from_str(&format_duration(duration)) {
        headers.insert(RESPONSE_TIME_HEADER, value);
    }
}

struct TraceGuard<'a> {
    tracer: &'a RequestTracer,
    ctx: RequestContext,
    route_label: String,
    finished: bool,
}

impl TraceGuard<'_> {
    fn finish(
        &mut self,
        outcome: Outcome,
        status: Option<StatusCode>,
        error: Option<String>,
    ) -> Duration {
        self.finished = true;

        let duration = self.tracer.clock.elapsed_since(self.ctx.start);
        let duration_ms = duration.as_secs_f64() * 1000.0;
        let client = self.ctx.client_address.map(|a| a.to_string());
        let client = client.as_deref().unwrap_or("-");
        let status = status.map(|s| s.as_u16());

        match &error {
            None => tracing::info!(
                correlation_id = %self.ctx.correlation_id,
                method = %self.ctx.method,
                path = %self.ctx.path,
                client_addr = client,
                route = %self.route_label,
                status = status,
                outcome = %outcome,
                duration_ms = duration_ms,
                "request completed"
            ),
            Some(error) => tracing::warn!(
                correlation_id = %self.ctx.correlation_id,
                method = %self.ctx.method,
                path = %self.ctx.path,
                client_addr = client,
                route = %self.route_label,
                error = %error,
                outcome = %outcome,
                duration_ms = duration_ms,
                "request failed"
            ),
        }

        self.tracer.sink.record(OutcomeRecord {
            route_label: std::mem::take(&mut self.route_label),
            status: outcome,
            duration,
        });

        duration
    }
}

impl Drop for TraceGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let reason = if std::thread::panicking() {
            "handler panicked"
        } else {
            "request cancelled before completion"
        };
        self.finish(Outcome::Error, None, Some(reason.to_string()));
    }
}
