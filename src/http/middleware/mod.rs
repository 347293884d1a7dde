//! Middleware chain.
//!
//! Each middleware is a `process(request, next) -> response` function wired
//! with `axum::middleware::from_fn_with_state`. The chain is assembled once
//! in `server.rs`.

pub mod rate_limit;
pub mod trace;

pub use rate_limit::{rate_limit_middleware, RateLimiterState};
pub use trace::trace_requests;
