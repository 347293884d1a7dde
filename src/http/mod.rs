//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware chain)
//!     → middleware/trace.rs (correlation id, timing, outcome record)
//!     → middleware/rate_limit.rs (optional)
//!     → handlers.rs / health endpoints
//!     → response stamped with x-correlation-id and x-response-time
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{AppState, GatewayServer};
