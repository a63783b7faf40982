//! Error taxonomy for relay calls.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single logical call through the relay chain.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Every registered relay is currently marked unhealthy.
    #[error("No healthy relay available")]
    NoHealthyRelay,

    /// The request could not be built; it was never sent.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The relay itself failed (network error, edge error status, bad body).
    #[error("Relay {relay} failed: {reason}")]
    RelayFailure { relay: String, reason: String },

    /// The relay worked but the upstream API rejected the call.
    #[error("Upstream error ({status}): {message}")]
    UpstreamError { status: u16, message: String },

    /// The upstream asked us to slow down.
    #[error("Rate limited by upstream: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// The fallback budget was spent without a successful attempt.
    #[error("All relays failed after {attempts} attempts: {last}")]
    AllRelaysFailed { attempts: u32, last: Box<RelayError> },
}

impl RelayError {
    /// True for transient faults of a relay, which trigger fallback.
    pub fn is_relay_fault(&self) -> bool {
        matches!(self, RelayError::RelayFailure { .. })
    }

    /// Short machine-readable code, used for JSON envelopes and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::NoHealthyRelay => "no_healthy_relay",
            RelayError::MalformedRequest(_) => "malformed_request",
            RelayError::RelayFailure { .. } => "relay_failure",
            RelayError::UpstreamError { .. } => "upstream_error",
            RelayError::RateLimited { .. } => "rate_limited",
            RelayError::AllRelaysFailed { .. } => "all_relays_failed",
        }
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised by a [`Transport`](crate::network::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelayError::UpstreamError {
            status: 400,
            message: "bad input".into(),
        };
        assert_eq!(err.to_string(), "Upstream error (400): bad input");

        let err = RelayError::AllRelaysFailed {
            attempts: 3,
            last: Box::new(RelayError::RelayFailure {
                relay: "worker".into(),
                reason: "status 530".into(),
            }),
        };
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.to_string().contains("status 530"));
    }

    #[test]
    fn test_relay_fault_classification() {
        assert!(RelayError::RelayFailure {
            relay: "a".into(),
            reason: "x".into()
        }
        .is_relay_fault());
        assert!(!RelayError::NoHealthyRelay.is_relay_fault());
        assert!(!RelayError::MalformedRequest("no query".into()).is_relay_fault());
        assert_eq!(RelayError::NoHealthyRelay.code(), "no_healthy_relay");
    }
}
