//! Active health checking.
//!
//! # Responsibilities
//! - Send a synthetic request through a relay
//! - Classify the response as healthy or not
//!
//! Probes never fail: every error resolves to "unhealthy".

use reqwest::{Method, StatusCode};
use std::time::Duration;

use crate::network::{RawResponse, Transport};
use crate::resilience::timeouts::with_timeout;
use crate::transform::ConcreteRequest;

/// Send `request` and classify the result.
pub async fn probe(transport: &dyn Transport, request: ConcreteRequest, timeout: Duration) -> bool {
    let method = request.method.clone();
    let url = request.url.clone();

    match with_timeout(timeout, transport.execute(request)).await {
        Ok(response) => {
            let healthy = classify_probe(&method, &response);
            if !healthy {
                tracing::warn!(
                    url = %url,
                    status = %response.status,
                    content_type = ?response.content_type(),
                    "Health probe failed"
                );
            }
            healthy
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Health probe failed: transport error");
            false
        }
    }
}

/// Probe verdict for a response.
pub fn classify_probe(method: &Method, response: &RawResponse) -> bool {
    let status = response.status;
    if *method == Method::OPTIONS && (status == StatusCode::OK || status == StatusCode::NO_CONTENT) {
        return true;
    }
    if !status.is_success() {
        return false;
    }
    match response.content_type() {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("application/json") || ct.contains("text/plain") || ct.contains("text/html")
        }
        None => false,
    }
}
