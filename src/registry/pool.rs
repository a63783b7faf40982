//! Relay registry.
//!
//! # Responsibilities
//! - Hold the fixed, priority-ordered relay list
//! - Select the preferred healthy relay, re-checking stale ones first
//! - Resolve a URL back to the relay that produced it
//! - Manual recovery (reset)

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::RelayProxyConfig;
use crate::health::HealthTracker;
use crate::network::Transport;
use crate::registry::endpoint::{EndpointStatus, RelayEndpoint};
use crate::transform::RequestTransformer;

/// Fixed set of relays plus the tracker that owns their health.
pub struct RelayRegistry {
    /// Sorted by priority; ties keep registration order.
    endpoints: Vec<Arc<RelayEndpoint>>,
    tracker: HealthTracker,
}

impl RelayRegistry {
    pub fn new(mut endpoints: Vec<RelayEndpoint>, tracker: HealthTracker) -> Self {
        // Stable: equal priorities stay in registration order.
        endpoints.sort_by_key(|e| e.priority());
        Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
            tracker,
        }
    }

    /// Build the registry described by `config`.
    pub fn from_config(config: &RelayProxyConfig, transport: Arc<dyn Transport>) -> Self {
        let endpoints = config.relays.iter().map(RelayEndpoint::from_config).collect();
        let tracker = HealthTracker::new(
            transport,
            RequestTransformer::new(&config.upstream),
            config.upstream.status_path.clone(),
            &config.health_check,
        );
        Self::new(endpoints, tracker)
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    /// All relays, in selection order.
    pub fn endpoints(&self) -> &[Arc<RelayEndpoint>] {
        &self.endpoints
    }

    /// Preferred healthy relay, or `None` if every relay is unhealthy.
    ///
    /// Unhealthy relays whose cooldown has elapsed are probed first (in
    /// parallel); relays still inside their cooldown are skipped.
    pub async fn select_endpoint(&self) -> Option<Arc<RelayEndpoint>> {
        let now = Instant::now();
        let stale: Vec<_> = self
            .endpoints
            .iter()
            .filter(|e| self.tracker.is_due(e, now))
            .collect();

        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "Re-checking relays past cooldown");
            join_all(stale.into_iter().map(|e| self.tracker.recheck(e))).await;
        }

        let selected = self.endpoints.iter().find(|e| e.is_healthy()).cloned();
        match &selected {
            Some(endpoint) => {
                tracing::debug!(relay = %endpoint.name(), priority = endpoint.priority(), "Selected relay");
            }
            None => {
                tracing::warn!(relay_count = self.endpoints.len(), "No healthy relay available");
                for e in &self.endpoints {
                    tracing::debug!(relay = %e.name(), last_checked = ?e.last_checked_at(), "Relay status");
                }
            }
        }
        selected
    }

    /// Relay whose base URL equals or prefixes `url`; the longest base wins.
    pub fn lookup(&self, url: &str) -> Option<Arc<RelayEndpoint>> {
        self.endpoints
            .iter()
            .filter(|e| e.matches_url(url))
            .max_by_key(|e| e.base_url().trim_end_matches('/').len())
            .cloned()
    }

    /// Mark the relay that produced `url` unhealthy. Returns false if unknown.
    pub fn mark_unhealthy_url(&self, url: &str) -> bool {
        match self.lookup(url) {
            Some(endpoint) => {
                self.tracker.mark_unhealthy(&endpoint);
                true
            }
            None => false,
        }
    }

    /// Every relay back to healthy.
    pub fn reset(&self) {
        for endpoint in &self.endpoints {
            self.tracker.mark_healthy(endpoint);
        }
        tracing::info!(relay_count = self.endpoints.len(), "Relay health reset");
    }

    pub fn snapshot(&self) -> Vec<EndpointStatus> {
        self.endpoints.iter().map(|e| e.status()).collect()
    }
}
