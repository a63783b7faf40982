//! The only writer of relay health.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::HealthCheckConfig;
use crate::health::active;
use crate::network::Transport;
use crate::observability::metrics;
use crate::registry::RelayEndpoint;
use crate::transform::RequestTransformer;

/// Marks relays unhealthy on failure and re-probes them after a cooldown.
pub struct HealthTracker {
    transport: Arc<dyn Transport>,
    transformer: RequestTransformer,
    status_path: String,
    cooldown: Duration,
    probe_timeout: Duration,
}

impl HealthTracker {
    pub fn new(
        transport: Arc<dyn Transport>,
        transformer: RequestTransformer,
        status_path: impl Into<String>,
        config: &HealthCheckConfig,
    ) -> Self {
        Self {
            transport,
            transformer,
            status_path: status_path.into(),
            cooldown: Duration::from_secs(config.cooldown_secs),
            probe_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record a failure signal. Idempotent.
    pub fn mark_unhealthy(&self, endpoint: &RelayEndpoint) {
        if endpoint.health().set(false, Instant::now()) {
            tracing::warn!(relay = %endpoint.name(), base_url = %endpoint.base_url(), "Relay marked unhealthy");
        }
        metrics::record_relay_health(endpoint.name(), false);
    }

    pub fn mark_healthy(&self, endpoint: &RelayEndpoint) {
        if endpoint.health().set(true, Instant::now()) {
            tracing::info!(relay = %endpoint.name(), "Relay marked healthy");
        }
        metrics::record_relay_health(endpoint.name(), true);
    }

    /// Unhealthy and past its cooldown.
    pub fn is_due(&self, endpoint: &RelayEndpoint, now: Instant) -> bool {
        endpoint.health().is_due(self.cooldown, now)
    }

    /// Synthetic request through `endpoint`. Never errors.
    pub async fn probe(&self, endpoint: &RelayEndpoint) -> bool {
        match self.transformer.probe_request(endpoint, &self.status_path) {
            Ok(request) => active::probe(self.transport.as_ref(), request, self.probe_timeout).await,
            Err(e) => {
                tracing::warn!(relay = %endpoint.name(), error = %e, "Cannot build health probe");
                false
            }
        }
    }

    /// Probe and record the verdict, unless a newer health write landed
    /// while the probe was in flight.
    pub async fn recheck(&self, endpoint: &RelayEndpoint) -> bool {
        let generation = endpoint.health().snapshot().generation;
        let healthy = self.probe(endpoint).await;

        match endpoint.health().apply_probe(generation, healthy, Instant::now()) {
            Some(changed) => {
                if changed && healthy {
                    tracing::info!(relay = %endpoint.name(), "Relay recovered after probe");
                }
                tracing::debug!(relay = %endpoint.name(), healthy, "Probe verdict recorded");
                metrics::record_relay_health(endpoint.name(), healthy);
            }
            None => {
                tracing::debug!(relay = %endpoint.name(), healthy, "Probe verdict superseded by newer report");
            }
        }
        endpoint.is_healthy()
    }
}
