//! Relay endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single relay
//! - Carry its static description (base URL, priority, kind, failure policy)
//! - Hold its health cell (written only by the health tracker)

use serde::Serialize;
use tokio::time::Instant;

use crate::config::RelayEndpointConfig;
use crate::health::{FailurePolicy, HealthCell};
use crate::transform::RelayKind;

/// A single relay endpoint.
#[derive(Debug)]
pub struct RelayEndpoint {
    name: String,
    base_url: String,
    priority: u32,
    requires_credentials: bool,
    kind: RelayKind,
    failure_policy: FailurePolicy,
    health: HealthCell,
}

impl RelayEndpoint {
    /// Create a relay with default policy and no credentials.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, priority: u32, kind: RelayKind) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            priority,
            requires_credentials: false,
            kind,
            failure_policy: FailurePolicy::default(),
            health: HealthCell::new(),
        }
    }

    pub fn from_config(config: &RelayEndpointConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.base_url.clone(),
            config.priority,
            config.kind.clone(),
        )
        .with_credentials(config.requires_credentials)
        .with_failure_policy(config.failure.clone())
    }

    pub fn with_credentials(mut self, requires_credentials: bool) -> Self {
        self.requires_credentials = requires_credentials;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn requires_credentials(&self) -> bool {
        self.requires_credentials
    }

    pub fn kind(&self) -> &RelayKind {
        &self.kind
    }

    pub fn failure_policy(&self) -> &FailurePolicy {
        &self.failure_policy
    }

    pub fn is_healthy(&self) -> bool {
        self.health.snapshot().healthy
    }

    pub fn last_checked_at(&self) -> Option<Instant> {
        self.health.snapshot().last_checked_at
    }

    /// True if `url` was produced for this relay: the base, or the base
    /// followed by a path or query.
    pub fn matches_url(&self, url: &str) -> bool {
        let base = self.base_url.trim_end_matches('/');
        match url.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }

    pub(crate) fn health(&self) -> &HealthCell {
        &self.health
    }

    pub fn status(&self) -> EndpointStatus {
        let record = self.health.snapshot();
        EndpointStatus {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            priority: self.priority,
            kind: self.kind.label(),
            healthy: record.healthy,
            last_checked_secs_ago: record
                .last_checked_at
                .map(|at| Instant::now().saturating_duration_since(at).as_secs()),
        }
    }
}

/// Serializable view of a relay for CLI and logs.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub base_url: String,
    pub priority: u32,
    pub kind: &'static str,
    pub healthy: bool,
    pub last_checked_secs_ago: Option<u64>,
}
