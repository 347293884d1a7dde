//! Per-client rate limiting middleware.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Tracked clients before idle buckets are swept.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn refilled(&self, now: Instant, capacity: f64, refill_rate: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        (self.tokens + elapsed * refill_rate).min(capacity)
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        self.tokens = self.refilled(now, capacity, refill_rate);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state, one bucket per client IP.
///
/// A bucket that has refilled to `burst` carries no state a fresh one would
/// not, so once the map grows past the sweep threshold those are dropped.
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    rps: f64,
    burst: f64,
    sweep_threshold: usize,
    next_sweep: AtomicUsize,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_sweep_threshold(config, DEFAULT_SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(config: &RateLimitConfig, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            buckets: DashMap::new(),
            rps: config.requests_per_second as f64,
            burst: config.burst_size.max(1) as f64,
            sweep_threshold: threshold,
            next_sweep: AtomicUsize::new(threshold),
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let allowed = match self.buckets.get_mut(key) {
            Some(mut bucket) => bucket.try_acquire(self.burst, self.rps),
            None => self
                .buckets
                .entry(key.to_string())
                .or_insert_with(|| TokenBucket::new(self.burst))
                .try_acquire(self.burst, self.rps),
        };

        if self.buckets.len() > self.next_sweep.load(Ordering::Relaxed) {
            self.sweep();
        }
        allowed
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Drop every bucket that has refilled to capacity.
    pub fn sweep(&self) {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| bucket.refilled(now, self.burst, self.rps) < self.burst);
        let after = self.buckets.len();

        // Busy clients survive the sweep; back off so the next one is not
        // triggered by the very next request.
        let next = self.sweep_threshold.max(after.saturating_mul(2));
        self.next_sweep.store(next, Ordering::Relaxed);

        tracing::debug!(before, after, next_sweep = next, "Swept idle rate limit buckets");
    }
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if state.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
    }
}
