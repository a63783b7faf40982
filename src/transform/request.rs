//! Logical and concrete request types.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use crate::error::{RelayError, RelayResult};

/// What the caller wants from the upstream API, before any relay rewriting.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    /// Path relative to the upstream host, optionally with a query string.
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl LogicalRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            path,
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A GraphQL POST with a `{query, variables}` JSON body.
    pub fn graphql(path: impl Into<String>, query: &str, variables: Value) -> Self {
        let body = json!({ "query": query, "variables": variables });
        Self::new(Method::POST, path)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body.to_string())
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach the access token as a bearer credential.
    pub fn with_bearer(self, token: &str) -> RelayResult<Self> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| RelayError::MalformedRequest("access token is not a valid header value".into()))?;
        Ok(self.with_header(AUTHORIZATION, value))
    }

    /// The raw token from `Authorization`, without the `Bearer ` scheme.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
        let token = match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ => value,
        };
        (!token.is_empty()).then_some(token)
    }

    /// Path without its query string.
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }

    /// True when `Content-Type` declares a JSON body.
    pub fn declares_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

/// A fully resolved request, ready to send to a relay.
#[derive(Debug, Clone)]
pub struct ConcreteRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        let req = LogicalRequest::get("/members/1").with_bearer("abc123").unwrap();
        assert_eq!(req.bearer_token(), Some("abc123"));

        let raw = LogicalRequest::get("/x")
            .with_header(AUTHORIZATION, HeaderValue::from_static("rawtoken"));
        assert_eq!(raw.bearer_token(), Some("rawtoken"));

        assert_eq!(LogicalRequest::get("/x").bearer_token(), None);
    }

    #[test]
    fn test_path_normalisation() {
        let req = LogicalRequest::get("members/1?fields=name");
        assert_eq!(req.path, "/members/1?fields=name");
        assert_eq!(req.route(), "/members/1");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = LogicalRequest::get("/x")
            .with_header(HeaderName::from_static("x-trace"), HeaderValue::from_static("1"))
            .with_header(HeaderName::from_bytes(b"X-Trace").unwrap(), HeaderValue::from_static("2"));
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get("x-trace").unwrap(), "2");
    }
}
