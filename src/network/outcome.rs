//! Per-attempt outcome classification.

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::network::RawResponse;
use crate::registry::RelayEndpoint;
use crate::resilience::rate_limit::{self, RateLimitSignal};

/// A successful API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    /// Name of the relay that served the call.
    pub relay: String,
}

impl ApiResponse {
    /// Status, serving relay and body as one JSON document.
    pub fn to_json(&self) -> Value {
        json!({
            "status": self.status.as_u16(),
            "relay": self.relay,
            "body": self.body,
        })
    }
}

/// Result of one attempt through one relay.
#[derive(Debug)]
pub enum Outcome {
    Success(ApiResponse),
    /// The relay is at fault; try another.
    RelayFailure(String),
    /// The upstream rejected the call; surface it.
    UpstreamError { status: u16, message: String },
    /// The upstream asked us to wait.
    RateLimited(RateLimitSignal),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::RelayFailure(_) => "relay_failure",
            Outcome::UpstreamError { .. } => "upstream_error",
            Outcome::RateLimited(_) => "rate_limited",
        }
    }
}

/// Classify a response received through `endpoint`.
pub fn classify(endpoint: &RelayEndpoint, response: RawResponse, rate_limit_code: &str) -> Outcome {
    let status = response.status;

    if let Some(reason) = endpoint.failure_policy().check(status.as_u16(), &response.body) {
        return Outcome::RelayFailure(reason);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Outcome::RateLimited(rate_limit::from_http_429(&response.headers, &response.body));
    }

    let body = if response.body.trim().is_empty() && status.is_success() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => body,
            Err(_) => {
                return Outcome::RelayFailure(format!(
                    "expected JSON from relay, got status {} with content type {:?}",
                    status,
                    response.content_type().unwrap_or("none")
                ));
            }
        }
    };

    if let Some(signal) = rate_limit::detect_graphql(&body, rate_limit_code, Utc::now()) {
        return Outcome::RateLimited(signal);
    }

    if !status.is_success() {
        return Outcome::UpstreamError {
            status: status.as_u16(),
            message: error_message(&body),
        };
    }

    if has_graphql_errors(&body) {
        return Outcome::UpstreamError {
            status: status.as_u16(),
            message: error_message(&body),
        };
    }

    Outcome::Success(ApiResponse {
        status,
        headers: response.headers,
        body,
        relay: endpoint.name().to_string(),
    })
}

fn has_graphql_errors(body: &Value) -> bool {
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| !errors.is_empty())
        .unwrap_or(false)
}

/// Human-readable message from an upstream error body.
fn error_message(body: &Value) -> String {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }
    for key in ["message", "error", "error_description"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }
    body.to_string()
}
