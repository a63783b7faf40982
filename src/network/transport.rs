//! Transport seam between the network layer and the wire.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::error::TransportError;
use crate::resilience::timeouts::with_timeout;
use crate::transform::ConcreteRequest;

/// A response as it came off the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Executes concrete requests. Implemented over reqwest in production and
/// by scripted fakes in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ConcreteRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TimeoutConfig) -> Result<Self, TransportError> {
        let timeout = Duration::from_secs(config.request_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_secs))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ConcreteRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        with_timeout(self.timeout, async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, TransportError>(RawResponse {
                status,
                headers,
                body,
            })
        })
        .await
    }
}
