//! Passive health checking (failure detection on live traffic).
//!
//! # Design Decisions
//! - Only relay-level signals count: network errors, edge error statuses,
//!   and known edge error signatures in error or non-JSON bodies
//! - Application errors from the upstream (e.g. 400 with a JSON body) are
//!   NOT relay failures
//! - The predicate is configurable per relay

use serde::{Deserialize, Serialize};

/// Which responses mark a relay unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FailurePolicy {
    /// Statuses produced by the relay itself rather than the upstream.
    pub statuses: Vec<u16>,

    /// Body substrings that identify an edge-network error page.
    pub signatures: Vec<String>,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            statuses: vec![530, 403],
            signatures: vec!["error code: 1016".to_string()],
        }
    }
}

impl FailurePolicy {
    /// Reason string if the response is a relay fault.
    ///
    /// Body signatures only apply to error statuses and non-JSON bodies; a
    /// 2xx JSON payload is data even when it quotes an edge error text.
    pub fn check(&self, status: u16, body: &str) -> Option<String> {
        if self.statuses.contains(&status) {
            return Some(format!("relay returned status {}", status));
        }
        if (200..300).contains(&status) && serde_json::from_str::<serde_json::Value>(body).is_ok() {
            return None;
        }
        self.signatures
            .iter()
            .find(|sig| !sig.is_empty() && body.contains(sig.as_str()))
            .map(|sig| format!("edge error signature '{}' (status {})", sig, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = FailurePolicy::default();
        assert!(policy.check(530, "").is_some());
        assert!(policy.check(403, "forbidden").is_some());
        assert!(policy.check(200, "<html>error code: 1016</html>").is_some());
        assert!(policy.check(400, r#"{"message":"bad"}"#).is_none());
        assert!(policy.check(500, "{}").is_none());
        assert!(policy.check(502, "error code: 1016").is_some());
    }

    #[test]
    fn test_signature_in_json_success_ignored() {
        let policy = FailurePolicy::default();
        let body = r#"{"data":{"event":{"description":"error code: 1016 is our band name"}}}"#;
        assert!(policy.check(200, body).is_none());
        assert!(policy.check(400, body).is_some());
    }

    #[test]
    fn test_custom_policy() {
        let policy = FailurePolicy {
            statuses: vec![400],
            signatures: vec![],
        };
        assert!(policy.check(400, "{}").is_some());
        assert!(policy.check(530, "").is_none());
    }
}
