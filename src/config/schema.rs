//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay chain
//! and the edge relay server. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

use crate::health::passive::FailurePolicy;
use crate::transform::RelayKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayProxyConfig {
    /// The single upstream API every relay forwards to.
    pub upstream: UpstreamConfig,

    /// Relay endpoints, in any order (sorted by priority at load).
    pub relays: Vec<RelayEndpointConfig>,

    /// Health tracking settings.
    pub health_check: HealthCheckConfig,

    /// Transport timeouts.
    pub timeouts: TimeoutConfig,

    /// Relay fallback settings.
    pub retries: RetryConfig,

    /// Upstream rate-limit handling.
    pub rate_limit: RateLimitConfig,

    /// Pacing for sequential bulk calls.
    pub pacing: PacingConfig,

    /// Edge relay server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// OAuth settings consumed by the auth collaborator.
    pub auth: AuthConfig,
}

impl Default for RelayProxyConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            relays: default_relays(),
            health_check: HealthCheckConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pacing: PacingConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Upstream API location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (no trailing slash).
    pub base_url: String,

    /// Path of the GraphQL endpoint.
    pub graphql_path: String,

    /// Cheap path used by health probes.
    pub status_path: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.meetup.com".to_string(),
            graphql_path: "/gql".to_string(),
            status_path: "/status".to_string(),
        }
    }
}

/// A single relay endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayEndpointConfig {
    /// Name used in logs and metrics.
    pub name: String,

    /// Base URL; also the relay's identity.
    pub base_url: String,

    /// Lower value = preferred.
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Whether ambient credentials (cookies) may be sent to this relay.
    #[serde(default)]
    pub requires_credentials: bool,

    /// How requests are rewritten for this relay.
    #[serde(default)]
    pub kind: RelayKind,

    /// Which responses count as a relay fault.
    #[serde(default)]
    pub failure: FailurePolicy,
}

fn default_priority() -> u32 {
    10
}

/// Built-in relay table.
pub fn default_relays() -> Vec<RelayEndpointConfig> {
    vec![
        RelayEndpointConfig {
            name: "worker".to_string(),
            base_url: "https://meetup-proxy.oneyashraj.workers.dev".to_string(),
            priority: 1,
            requires_credentials: true,
            kind: RelayKind::PathPrefix {
                prefix: "/proxy".to_string(),
            },
            failure: FailurePolicy::default(),
        },
        RelayEndpointConfig {
            name: "allorigins".to_string(),
            base_url: "https://api.allorigins.win/raw".to_string(),
            priority: 2,
            requires_credentials: false,
            kind: RelayKind::QueryParam {
                target_param: "url".to_string(),
                auth_param: "authorization".to_string(),
            },
            failure: FailurePolicy::default(),
        },
    ]
}

/// Health tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Seconds an unhealthy relay is skipped before it is probed again.
    pub cooldown_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            timeout_secs: 10,
        }
    }
}

/// Timeout configuration for relay calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Relay fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Relay attempts per logical call (1..=5).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 300,
            max_delay_ms: 3000,
        }
    }
}

/// Upstream rate-limit handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// GraphQL `extensions.code` that signals a rate limit.
    pub error_code: String,

    /// Wait used when the upstream gives no reset time.
    pub min_wait_secs: u64,

    /// Upper bound on any single wait.
    pub max_wait_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            error_code: "RATE_LIMITED".to_string(),
            min_wait_secs: 30,
            max_wait_secs: 300,
        }
    }
}

/// Pacing for sequential bulk calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay inserted between consecutive calls in milliseconds.
    pub inter_call_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: 1000,
        }
    }
}

/// Edge relay server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Path prefix under which requests are forwarded.
    pub path_prefix: String,

    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,

    /// Deadline for a relayed request in seconds. Must exceed
    /// `timeouts.request_secs` so the upstream client gives up first.
    pub request_timeout_secs: u64,

    /// User-Agent sent upstream.
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            path_prefix: "/proxy".to_string(),
            allowed_origin: "*".to_string(),
            max_age_secs: 86_400,
            request_timeout_secs: 35,
            user_agent: "relay-proxy/0.1".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// OAuth values owned by the auth collaborator; carried, never interpreted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
}
