//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (MESHGATE_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    FeatureToggles, GatewayConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, RouteConfig, ServiceConfig, TimeoutConfig,
};
