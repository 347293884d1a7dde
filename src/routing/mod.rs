//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → registry.rs (parse upstream URLs, compile matchers)
//!     → Freeze as immutable RouteRegistry
//!
//! Queries:
//!     path → registry.rs (longest prefix) → RouteEntry | None
//!     /routes, /status → router.rs (GatewayRouter)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod registry;
pub mod router;

pub use registry::{RegistryError, RouteEntry, RouteListing, RouteRegistry};
pub use router::{AggregateHealth, AggregateStatus, GatewayRouter, HealthVerdict};
