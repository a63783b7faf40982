//! Edge relay server.
//!
//! # Responsibilities
//! - Answer CORS preflights on any path
//! - Forward GET/POST under the configured prefix to the upstream host
//! - Forward only `Authorization` and `Content-Type` from the caller
//! - Turn non-JSON upstream bodies and network failures into JSON envelopes
//! - Request IDs and tracing
//! - A per-request deadline that still answers with a CORS-enabled envelope

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{RelayProxyConfig, ServerConfig, UpstreamConfig};
use crate::error::TransportError;
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::{error_envelope, preflight, relayed};

/// Largest request body accepted for forwarding.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct RelayState {
    client: reqwest::Client,
    upstream: Arc<UpstreamConfig>,
    server: Arc<ServerConfig>,
}

/// HTTP server that relays calls to the upstream API.
pub struct RelayServer {
    router: Router,
    config: RelayProxyConfig,
}

impl RelayServer {
    pub fn new(config: RelayProxyConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()?;

        let state = RelayState {
            client,
            upstream: Arc::new(config.upstream.clone()),
            server: Arc::new(config.server.clone()),
        };

        let router = Self::build_router(&config.server, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(server: &ServerConfig, state: RelayState) -> Router {
        let prefix = server.path_prefix.trim_end_matches('/');
        Router::new()
            .route(&format!("{}/{{*path}}", prefix), any(relay_handler))
            .fallback(fallback_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &RelayProxyConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            prefix = %self.config.server.path_prefix,
            "Relay server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Relay server received shutdown signal");
            })
            .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }
}

/// Forwarding handler for `<prefix>/{*path}`.
async fn relay_handler(
    State(state): State<RelayState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Response {
    let method = request.method().clone();
    if method == Method::OPTIONS {
        return preflight(&state.server);
    }
    if method != Method::GET && method != Method::POST {
        return error_envelope(
            &state.server,
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            format!("{} is not supported", method),
        );
    }

    let request_id = request_id(request.headers());
    let deadline = Duration::from_secs(state.server.request_timeout_secs);

    match tokio::time::timeout(deadline, forward(&state, path, &request_id, request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(request_id = %request_id, deadline = ?deadline, "Relay deadline elapsed");
            error_envelope(
                &state.server,
                StatusCode::GATEWAY_TIMEOUT,
                "upstream_timeout",
                format!("upstream did not answer within {}s", deadline.as_secs()),
            )
        }
    }
}

/// Send `request` upstream and shape the answer.
async fn forward(state: &RelayState, path: String, request_id: &str, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let (parts, body) = request.into_parts();

    let upstream_path = format!("/{}", path.trim_start_matches('/'));
    let mut target = format!("{}{}", state.upstream.base_url.trim_end_matches('/'), upstream_path);
    if let Some(query) = parts.uri.query() {
        target.push('?');
        target.push_str(query);
    }

    tracing::debug!(request_id = %request_id, method = %method, path = %upstream_path, "Relaying request");

    let mut outbound = state
        .client
        .request(method.clone(), &target)
        .header(header::ACCEPT, "application/json")
        .header(header::USER_AGENT, state.server.user_agent.as_str());
    for name in [header::AUTHORIZATION, header::CONTENT_TYPE] {
        if let Some(value) = parts.headers.get(&name) {
            outbound = outbound.header(name, value.clone());
        }
    }

    if method == Method::POST && declares_json(&parts.headers) {
        let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return error_envelope(
                    &state.server,
                    StatusCode::BAD_REQUEST,
                    "invalid_body",
                    format!("could not read request body: {}", e),
                );
            }
        };

        if upstream_path == state.upstream.graphql_path {
            if let Err(message) = check_graphql_body(&bytes) {
                return error_envelope(&state.server, StatusCode::BAD_REQUEST, "malformed_request", message);
            }
        }
        outbound = outbound.body(bytes);
    }

    let response = match outbound.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            tracing::warn!(request_id = %request_id, error = %e, "Upstream request timed out");
            return error_envelope(
                &state.server,
                StatusCode::GATEWAY_TIMEOUT,
                "upstream_timeout",
                "upstream request timed out",
            );
        }
        Err(e) if e.is_builder() => {
            tracing::error!(request_id = %request_id, error = %e, "Could not build upstream request");
            return error_envelope(
                &state.server,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "relay could not build the upstream request",
            );
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream request failed");
            return error_envelope(
                &state.server,
                StatusCode::BAD_GATEWAY,
                "upstream_unreachable",
                "upstream request failed",
            );
        }
    };

    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to read upstream body");
            return error_envelope(
                &state.server,
                StatusCode::BAD_GATEWAY,
                "upstream_unreadable",
                "upstream response could not be read",
            );
        }
    };

    if !text.trim().is_empty() && serde_json::from_str::<Value>(&text).is_err() {
        tracing::warn!(request_id = %request_id, status = %status, "Upstream returned non-JSON body");
        return error_envelope(
            &state.server,
            StatusCode::BAD_GATEWAY,
            "invalid_upstream_response",
            format!("upstream returned a non-JSON body with status {}", status.as_u16()),
        );
    }

    tracing::debug!(request_id = %request_id, status = %status, "Relayed upstream response");
    relayed(&state.server, status, text)
}

/// Preflights anywhere; everything else outside the prefix is unknown.
async fn fallback_handler(State(state): State<RelayState>, request: Request<Body>) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight(&state.server);
    }
    error_envelope(
        &state.server,
        StatusCode::NOT_FOUND,
        "not_found",
        format!("no relay route for {}", request.uri().path()),
    )
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

fn check_graphql_body(bytes: &[u8]) -> Result<(), String> {
    let body: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid GraphQL request body: {}", e))?;
    match body.get("query") {
        Some(Value::String(_)) => Ok(()),
        _ => Err("GraphQL request is missing query".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn server() -> RelayServer {
        RelayServer::new(RelayProxyConfig::default()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_anywhere() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/proxy/gql")
            .body(Body::empty())
            .unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(response.headers().contains_key("x-request-id"));

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/elsewhere")
            .body(Body::empty())
            .unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unsupported_method_envelope() {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/proxy/members/1")
            .body(Body::empty())
            .unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "method_not_allowed");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_graphql_without_query_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/proxy/gql")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"variables":{}}"#))
            .unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "malformed_request");
    }

    #[tokio::test]
    async fn test_unknown_path_envelope() {
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");
    }
}
