//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → RelayProxyConfig (validated, immutable)
//!     → registry, network layer, relay server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AuthConfig, HealthCheckConfig, ObservabilityConfig, PacingConfig, RateLimitConfig,
    RelayEndpointConfig, RelayProxyConfig, RetryConfig, ServerConfig, TimeoutConfig,
    UpstreamConfig,
};
