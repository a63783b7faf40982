//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use relay_proxy::config::RelayProxyConfig;
use relay_proxy::health::HealthTracker;
use relay_proxy::network::{RawResponse, Transport};
use relay_proxy::transform::ConcreteRequest;
use relay_proxy::{NetworkLayer, RelayEndpoint, RelayKind, RelayRegistry, RequestTransformer, TransportError};

/// What a scripted relay answers, after an optional delay.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<RawResponse, TransportError>,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, "application/json", &body.to_string())
    }

    pub fn text(status: u16, content_type: &'static str, body: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            delay: Duration::ZERO,
            result: Ok(RawResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers,
                body: body.to_string(),
            }),
        }
    }

    /// `429 Too Many Requests` with `Retry-After` in seconds.
    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        let mut reply = Self::text(429, "text/plain", "slow down");
        if let Ok(response) = &mut reply.result {
            response
                .headers
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        reply
    }

    /// `204` answer to an OPTIONS probe.
    pub fn preflight() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(RawResponse {
                status: StatusCode::NO_CONTENT,
                headers: HeaderMap::new(),
                body: String::new(),
            }),
        }
    }

    pub fn connect_error() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(TransportError::Connect("connection refused".into())),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = dyn Fn(&ConcreteRequest) -> Reply + Send + Sync;

/// In-memory transport that answers from a closure and records every call.
pub struct MockTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<ConcreteRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ConcreteRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ConcreteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls whose URL host is `host`, excluding health probes.
    pub fn traffic_to(&self, host: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.url.host_str() == Some(host) && c.method != Method::OPTIONS)
            .count()
    }

    /// Health probes sent to `host`.
    pub fn probes_to(&self, host: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.url.host_str() == Some(host) && c.method == Method::OPTIONS)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ConcreteRequest) -> Result<RawResponse, TransportError> {
        let reply = (self.handler)(&request);
        self.calls.lock().unwrap().push(request);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}

/// Direct relay at `https://<host>`.
pub fn direct_relay(host: &str, priority: u32) -> RelayEndpoint {
    RelayEndpoint::new(host, format!("https://{}", host), priority, RelayKind::Direct)
}

/// Registry and network layer over `transport`.
pub fn build_layer(
    config: &RelayProxyConfig,
    relays: Vec<RelayEndpoint>,
    transport: Arc<MockTransport>,
) -> (Arc<RelayRegistry>, NetworkLayer) {
    let transport: Arc<dyn Transport> = transport;
    let tracker = HealthTracker::new(
        transport.clone(),
        RequestTransformer::new(&config.upstream),
        config.upstream.status_path.clone(),
        &config.health_check,
    );
    let registry = Arc::new(RelayRegistry::new(relays, tracker));
    let layer = NetworkLayer::new(config, registry.clone(), transport);
    (registry, layer)
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives the raw request text (head and body) and returns
/// `(status, content_type, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let (status, content_type, body) = f(request).await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");

                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.trim()
                        .eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
