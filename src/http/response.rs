//! Response shaping for the edge relay.
//!
//! # Responsibilities
//! - CORS headers on every response, including errors
//! - Preflight answers
//! - JSON error envelopes (`{"error": code, "message": text}`)
//!
//! Upstream headers are never copied through; the relayed response always
//! carries `Content-Type: application/json`.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::ServerConfig;
use crate::observability::metrics;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// CORS headers for `config`.
///
/// `Allow-Credentials` is only sent with a concrete origin, since browsers
/// reject it alongside a wildcard.
pub fn cors_headers(config: &ServerConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let origin = HeaderValue::from_str(&config.allowed_origin)
        .unwrap_or_else(|_| HeaderValue::from_static("*"));
    let wildcard = origin == "*";
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    if !wildcard {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    headers
}

/// Answer to an `OPTIONS` preflight.
pub fn preflight(config: &ServerConfig) -> Response {
    let mut headers = cors_headers(config);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(config.max_age_secs));

    metrics::record_server_response(StatusCode::NO_CONTENT.as_u16());
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// JSON error envelope with CORS headers.
pub fn error_envelope(
    config: &ServerConfig,
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> Response {
    metrics::record_server_response(status.as_u16());
    let body = json!({ "error": code, "message": message.into() });
    (status, cors_headers(config), Json(body)).into_response()
}

/// Relayed upstream body with the upstream status.
pub fn relayed(config: &ServerConfig, status: StatusCode, body: String) -> Response {
    metrics::record_server_response(status.as_u16());
    let mut headers = cors_headers(config);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    (status, headers, Body::from(body)).into_response()
}
