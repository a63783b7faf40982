//! Retry/fallback orchestration for one logical call.
//!
//! # State Machine
//! ```text
//! Selecting ──none──▶ NoHealthyRelay
//!     │
//!     ▼
//! Sending ──▶ Success ───────────▶ Ok(response)
//!     ├─────▶ UpstreamError ─────▶ Err(UpstreamError), relay untouched
//!     ├─────▶ RateLimited ───────▶ wait for reset, back to Selecting (once)
//!     └─────▶ RelayFailure ──────▶ mark unhealthy, back off, back to Selecting
//!                                  (bounded; AllRelaysFailed when spent)
//! ```

use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::config::validation::MAX_RELAY_ATTEMPTS;
use crate::config::{PacingConfig, RateLimitConfig, RelayProxyConfig, RetryConfig};
use crate::error::{RelayError, RelayResult, TransportError};
use crate::network::outcome::{classify, ApiResponse, Outcome};
use crate::network::transport::{HttpTransport, Transport};
use crate::observability::{metrics, spans};
use crate::registry::RelayRegistry;
use crate::resilience::backoff::fallback_delay;
use crate::resilience::rate_limit;
use crate::transform::{LogicalRequest, RequestTransformer};

/// Sends logical calls through the relay chain.
pub struct NetworkLayer {
    registry: Arc<RelayRegistry>,
    transport: Arc<dyn Transport>,
    transformer: RequestTransformer,
    retries: RetryConfig,
    rate_limit: RateLimitConfig,
    pacing: PacingConfig,
}

impl NetworkLayer {
    pub fn new(
        config: &RelayProxyConfig,
        registry: Arc<RelayRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            registry,
            transport,
            transformer: RequestTransformer::new(&config.upstream),
            retries: config.retries.clone(),
            rate_limit: config.rate_limit.clone(),
            pacing: config.pacing.clone(),
        }
    }

    /// Layer over reqwest with a registry built from `config`.
    pub fn from_config(config: &RelayProxyConfig) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.timeouts)?);
        let registry = Arc::new(RelayRegistry::from_config(config, transport.clone()));
        Ok(Self::new(config, registry, transport))
    }

    pub fn registry(&self) -> &Arc<RelayRegistry> {
        &self.registry
    }

    pub fn transformer(&self) -> &RequestTransformer {
        &self.transformer
    }

    /// Relay attempts allowed per call.
    pub fn max_attempts(&self) -> u32 {
        self.retries.max_attempts.clamp(1, MAX_RELAY_ATTEMPTS)
    }

    /// Run one logical call to completion.
    pub async fn execute(&self, request: LogicalRequest) -> RelayResult<ApiResponse> {
        let span = spans::call_span(&request);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: LogicalRequest) -> RelayResult<ApiResponse> {
        // Fail fast, before selection can trigger any probe traffic.
        self.transformer.validate(&request)?;

        let max_attempts = self.max_attempts();
        let mut failures = 0u32;
        let mut rate_limit_retried = false;

        loop {
            let Some(endpoint) = self.registry.select_endpoint().await else {
                return Err(RelayError::NoHealthyRelay);
            };

            let concrete = self.transformer.transform(&endpoint, &request)?;
            tracing::debug!(
                relay = %endpoint.name(),
                attempt = failures + 1,
                method = %concrete.method,
                "Sending through relay"
            );

            let outcome = match self.transport.execute(concrete).await {
                Ok(response) => classify(&endpoint, response, &self.rate_limit.error_code),
                Err(e) => Outcome::RelayFailure(e.to_string()),
            };
            metrics::record_attempt(endpoint.name(), outcome.label());

            match outcome {
                Outcome::Success(response) => {
                    tracing::debug!(relay = %endpoint.name(), status = %response.status, "Call succeeded");
                    return Ok(response);
                }
                Outcome::UpstreamError { status, message } => {
                    tracing::info!(relay = %endpoint.name(), status, message = %message, "Upstream rejected call");
                    return Err(RelayError::UpstreamError { status, message });
                }
                Outcome::RateLimited(signal) => {
                    metrics::record_rate_limited();
                    if rate_limit_retried {
                        tracing::warn!(relay = %endpoint.name(), "Rate limited again after waiting");
                        return Err(RelayError::RateLimited {
                            retry_after: signal.reset_after,
                            message: signal.message,
                        });
                    }
                    rate_limit_retried = true;

                    let wait = rate_limit::wait_duration(signal.reset_after, &self.rate_limit);
                    tracing::warn!(
                        relay = %endpoint.name(),
                        wait_secs = wait.as_secs(),
                        message = %signal.message,
                        "Upstream rate limit, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                }
                Outcome::RelayFailure(reason) => {
                    self.registry.tracker().mark_unhealthy(&endpoint);
                    failures += 1;
                    tracing::warn!(
                        relay = %endpoint.name(),
                        attempt = failures,
                        max_attempts,
                        reason = %reason,
                        "Relay failed"
                    );

                    let error = RelayError::RelayFailure {
                        relay: endpoint.name().to_string(),
                        reason,
                    };
                    if failures >= max_attempts {
                        return Err(RelayError::AllRelaysFailed {
                            attempts: failures,
                            last: Box::new(error),
                        });
                    }

                    metrics::record_fallback(endpoint.name());
                    let delay = fallback_delay(failures, &self.retries);
                    tracing::info!(delay = ?delay, "Falling back to next relay");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// GraphQL call returning the response's `data` member.
    pub async fn graphql(&self, query: &str, variables: Value, token: &str) -> RelayResult<Value> {
        let request = LogicalRequest::graphql(self.transformer.graphql_path(), query, variables)
            .with_bearer(token)?;
        let mut response = self.execute(request).await?;
        Ok(response
            .body
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// REST call against `path` on the upstream host.
    pub async fn rest(&self, method: Method, path: &str, token: &str) -> RelayResult<ApiResponse> {
        let request = LogicalRequest::new(method, path).with_bearer(token)?;
        self.execute(request).await
    }

    /// Run calls one after another with the configured delay between them.
    pub async fn execute_paced(&self, requests: Vec<LogicalRequest>) -> Vec<RelayResult<ApiResponse>> {
        let delay = Duration::from_millis(self.pacing.inter_call_delay_ms);
        let mut results = Vec::with_capacity(requests.len());
        for (i, request) in requests.into_iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            results.push(self.execute(request).await);
        }
        results
    }
}
