//! Request transformation subsystem.
//!
//! # Data Flow
//! ```text
//! LogicalRequest (path, method, headers, body)
//!     → validate (GraphQL body has `query`, declared JSON parses)
//!     → dispatch on RelayKind (kind.rs)
//!         - URL rewrite (prefix, query-parameter target)
//!         - credential relocation (header, query string, body)
//!     → ConcreteRequest (absolute URL, ready to send)
//! ```
//!
//! # Design Decisions
//! - Validation runs before any rewriting so nothing malformed is ever sent
//! - A relay that cannot validate `Authorization` never receives it
//! - Probe request shapes live here too, next to the request shapes they mirror

pub mod kind;
pub mod request;

pub use kind::{BodyAuthField, RelayKind};
pub use request::{ConcreteRequest, LogicalRequest};

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE,
};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{RelayError, RelayResult};
use crate::registry::RelayEndpoint;

const APPLICATION_JSON: &str = "application/json";

/// Rewrites logical requests into the wire shape each relay expects.
#[derive(Debug, Clone)]
pub struct RequestTransformer {
    upstream_base: String,
    graphql_path: String,
}

impl RequestTransformer {
    pub fn new(upstream: &UpstreamConfig) -> Self {
        Self {
            upstream_base: upstream.base_url.trim_end_matches('/').to_string(),
            graphql_path: upstream.graphql_path.clone(),
        }
    }

    pub fn graphql_path(&self) -> &str {
        &self.graphql_path
    }

    pub fn is_graphql(&self, request: &LogicalRequest) -> bool {
        request.route() == self.graphql_path
    }

    /// Check a logical request without rewriting it.
    ///
    /// Returns the parsed GraphQL body for GraphQL calls.
    pub fn validate(&self, request: &LogicalRequest) -> RelayResult<Option<Map<String, Value>>> {
        if self.is_graphql(request) {
            let body = request
                .body
                .as_deref()
                .ok_or_else(|| malformed("GraphQL request body is missing"))?;
            let parsed: Value = serde_json::from_str(body)
                .map_err(|e| malformed(format!("invalid GraphQL request body: {}", e)))?;
            let Value::Object(map) = parsed else {
                return Err(malformed("GraphQL request body must be a JSON object"));
            };
            if !map.get("query").map(Value::is_string).unwrap_or(false) {
                return Err(malformed("GraphQL request is missing query"));
            }
            return Ok(Some(map));
        }

        if let Some(body) = request.body.as_deref() {
            if request.declares_json() {
                serde_json::from_str::<Value>(body)
                    .map_err(|e| malformed(format!("declared JSON body does not parse: {}", e)))?;
            }
        }
        Ok(None)
    }

    /// Produce the concrete request for `endpoint`.
    pub fn transform(
        &self,
        endpoint: &RelayEndpoint,
        request: &LogicalRequest,
    ) -> RelayResult<ConcreteRequest> {
        let graphql_body = self.validate(request)?;
        let token = request.bearer_token().map(str::to_owned);
        let base = endpoint.base_url();

        let mut concrete = match endpoint.kind() {
            RelayKind::Direct => ConcreteRequest {
                url: join_url(base, &request.path)?,
                method: request.method.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
            },
            RelayKind::PathPrefix { prefix } => {
                let mut headers = request.headers.clone();
                set_json_headers(&mut headers);
                ConcreteRequest {
                    url: join_url(base, &format!("{}{}", prefix.trim_end_matches('/'), request.path))?,
                    method: if graphql_body.is_some() {
                        Method::POST
                    } else {
                        request.method.clone()
                    },
                    headers,
                    body: request.body.clone(),
                }
            }
            RelayKind::QueryParam {
                target_param,
                auth_param,
            } => {
                let target = format!("{}{}", self.upstream_base, request.path);
                let mut url = parse_url(base)?;
                url.query_pairs_mut().append_pair(target_param, &target);

                let mut headers = HeaderMap::new();
                set_json_headers(&mut headers);

                match graphql_body {
                    Some(mut body) => {
                        if let Some(token) = &token {
                            embed_token(&mut body, "extensions", "authorization", token);
                        }
                        ConcreteRequest {
                            url,
                            method: Method::POST,
                            headers,
                            body: Some(serialize_body(body)?),
                        }
                    }
                    None => {
                        if let Some(token) = &token {
                            url.query_pairs_mut().append_pair(auth_param, token);
                        }
                        ConcreteRequest {
                            url,
                            method: request.method.clone(),
                            headers,
                            body: request.body.clone(),
                        }
                    }
                }
            }
            RelayKind::BodyEmbeddedAuth {
                field,
                key,
                query_param,
            } => {
                let mut url = join_url(base, &request.path)?;
                let mut headers = request.headers.clone();
                headers.remove(AUTHORIZATION);

                match graphql_body {
                    Some(mut body) => {
                        if let Some(token) = &token {
                            embed_token(&mut body, field.as_str(), key, token);
                        }
                        ConcreteRequest {
                            url,
                            method: Method::POST,
                            headers,
                            body: Some(serialize_body(body)?),
                        }
                    }
                    None => {
                        if let Some(token) = &token {
                            url.query_pairs_mut().append_pair(query_param, token);
                        }
                        ConcreteRequest {
                            url,
                            method: request.method.clone(),
                            headers,
                            body: request.body.clone(),
                        }
                    }
                }
            }
        };

        if !endpoint.kind().forwards_auth_header() {
            concrete.headers.remove(AUTHORIZATION);
        }
        if !endpoint.requires_credentials() {
            concrete.headers.remove(COOKIE);
        }

        tracing::trace!(
            relay = %endpoint.name(),
            kind = endpoint.kind().label(),
            method = %concrete.method,
            url = %redact(&concrete.url),
            "Request transformed"
        );

        Ok(concrete)
    }

    /// Synthetic health probe against the upstream status path.
    ///
    /// Uses `OPTIONS` where the relay supports it and `GET` otherwise; this
    /// substitution never applies to real traffic.
    pub fn probe_request(
        &self,
        endpoint: &RelayEndpoint,
        status_path: &str,
    ) -> RelayResult<ConcreteRequest> {
        let base = endpoint.base_url();
        let method = endpoint.kind().probe_method();

        let url = match endpoint.kind() {
            RelayKind::Direct | RelayKind::BodyEmbeddedAuth { .. } => join_url(base, status_path)?,
            RelayKind::PathPrefix { prefix } => {
                join_url(base, &format!("{}{}", prefix.trim_end_matches('/'), status_path))?
            }
            RelayKind::QueryParam { target_param, .. } => {
                let mut url = parse_url(base)?;
                url.query_pairs_mut()
                    .append_pair(target_param, &format!("{}{}", self.upstream_base, status_path));
                url
            }
        };

        let mut headers = HeaderMap::new();
        set_json_headers(&mut headers);
        if method == Method::OPTIONS {
            headers.insert(
                HeaderName::from_static("access-control-request-method"),
                HeaderValue::from_static("POST"),
            );
            headers.insert(
                HeaderName::from_static("access-control-request-headers"),
                HeaderValue::from_static("authorization,content-type"),
            );
        }

        Ok(ConcreteRequest {
            url,
            method,
            headers,
            body: None,
        })
    }
}

fn malformed(message: impl Into<String>) -> RelayError {
    RelayError::MalformedRequest(message.into())
}

fn parse_url(raw: &str) -> RelayResult<Url> {
    Url::parse(raw).map_err(|e| malformed(format!("invalid URL '{}': {}", raw, e)))
}

fn join_url(base: &str, suffix: &str) -> RelayResult<Url> {
    parse_url(&format!("{}{}", base.trim_end_matches('/'), suffix))
}

fn set_json_headers(headers: &mut HeaderMap) {
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
}

/// Insert `token` at `body[field][key]`, replacing a non-object `field`.
fn embed_token(body: &mut Map<String, Value>, field: &str, key: &str, token: &str) {
    let slot = body
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        map.insert(key.to_string(), Value::String(token.to_string()));
    }
}

fn serialize_body(body: Map<String, Value>) -> RelayResult<String> {
    serde_json::to_string(&Value::Object(body))
        .map_err(|e| malformed(format!("failed to encode GraphQL body: {}", e)))
}

/// URL with its query string elided, safe to log.
pub fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    if shown.query().is_some() {
        shown.set_query(Some("…"));
    }
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transformer() -> RequestTransformer {
        RequestTransformer::new(&UpstreamConfig::default())
    }

    fn graphql_request() -> LogicalRequest {
        LogicalRequest::graphql("/gql", "query { self { id } }", json!({ "first": 20 }))
            .with_bearer("tok-1")
            .unwrap()
    }

    fn body_json(req: &ConcreteRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_direct_pass_through() {
        let endpoint = RelayEndpoint::new("edge", "https://relay.example/proxy", 1, RelayKind::Direct);
        let req = LogicalRequest::get("/members/123")
            .with_header(HeaderName::from_static("x-trace"), HeaderValue::from_static("t1"));

        let concrete = transformer().transform(&endpoint, &req).unwrap();
        assert_eq!(concrete.url.as_str(), "https://relay.example/proxy/members/123");
        assert_eq!(concrete.method, Method::GET);
        assert_eq!(concrete.headers, req.headers);
        assert!(concrete.body.is_none());
    }

    #[test]
    fn test_missing_query_is_malformed() {
        let endpoint = RelayEndpoint::new("edge", "https://relay.example", 1, RelayKind::Direct);
        let req = LogicalRequest::new(Method::POST, "/gql").with_body(r#"{"variables":{}}"#);
        let err = transformer().transform(&endpoint, &req).unwrap_err();
        assert!(matches!(err, RelayError::MalformedRequest(_)));

        let missing = LogicalRequest::new(Method::POST, "/gql");
        assert!(matches!(
            transformer().transform(&endpoint, &missing),
            Err(RelayError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_declared_json_must_parse() {
        let endpoint = RelayEndpoint::new("edge", "https://relay.example", 1, RelayKind::Direct);
        let req = LogicalRequest::new(Method::POST, "/members/1")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{not json");
        assert!(matches!(
            transformer().transform(&endpoint, &req),
            Err(RelayError::MalformedRequest(_))
        ));

        let plain = LogicalRequest::new(Method::POST, "/members/1").with_body("{not json");
        assert!(transformer().transform(&endpoint, &plain).is_ok());
    }

    #[test]
    fn test_path_prefix_keeps_auth_and_forces_post() {
        let endpoint = RelayEndpoint::new(
            "worker",
            "https://worker.example",
            1,
            RelayKind::PathPrefix { prefix: "/proxy".into() },
        );
        let mut req = graphql_request();
        req.method = Method::GET;

        let concrete = transformer().transform(&endpoint, &req).unwrap();
        assert_eq!(concrete.url.as_str(), "https://worker.example/proxy/gql");
        assert_eq!(concrete.method, Method::POST);
        assert_eq!(concrete.headers.get(AUTHORIZATION).unwrap(), "Bearer tok-1");
        assert_eq!(concrete.headers.get(ACCEPT).unwrap(), APPLICATION_JSON);

        let rest = LogicalRequest::new(Method::DELETE, "/members/9");
        let concrete = transformer().transform(&endpoint, &rest).unwrap();
        assert_eq!(concrete.method, Method::DELETE);
        assert_eq!(concrete.url.path(), "/proxy/members/9");
    }

    #[test]
    fn test_query_param_relocates_token_into_body() {
        let endpoint = RelayEndpoint::new(
            "allorigins",
            "https://relay.example/raw",
            2,
            RelayKind::QueryParam {
                target_param: "url".into(),
                auth_param: "authorization".into(),
            },
        );

        let concrete = transformer().transform(&endpoint, &graphql_request()).unwrap();
        assert!(concrete.headers.get(AUTHORIZATION).is_none());
        assert_eq!(concrete.method, Method::POST);

        let pairs: Vec<(String, String)> = concrete.url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("url".to_string(), "https://api.meetup.com/gql".to_string())]);

        let body = body_json(&concrete);
        assert_eq!(body["extensions"]["authorization"], "tok-1");
        assert_eq!(body["query"], "query { self { id } }");
        assert_eq!(body["variables"]["first"], 20);
    }

    #[test]
    fn test_query_param_rest_token_in_url() {
        let endpoint = RelayEndpoint::new(
            "allorigins",
            "https://relay.example/raw",
            2,
            RelayKind::QueryParam {
                target_param: "url".into(),
                auth_param: "authorization".into(),
            },
        );
        let req = LogicalRequest::get("/members/123").with_bearer("tok-2").unwrap();

        let concrete = transformer().transform(&endpoint, &req).unwrap();
        assert!(concrete.headers.get(AUTHORIZATION).is_none());
        assert_eq!(concrete.method, Method::GET);
        let pairs: Vec<(String, String)> = concrete.url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0].1, "https://api.meetup.com/members/123");
        assert_eq!(pairs[1], ("authorization".to_string(), "tok-2".to_string()));
    }

    #[test]
    fn test_body_embedded_auth_variables() {
        let endpoint = RelayEndpoint::new(
            "body",
            "https://body.example",
            3,
            RelayKind::BodyEmbeddedAuth {
                field: BodyAuthField::Variables,
                key: "accessToken".into(),
                query_param: "access_token".into(),
            },
        );

        let concrete = transformer().transform(&endpoint, &graphql_request()).unwrap();
        assert!(concrete.headers.get(AUTHORIZATION).is_none());
        assert_eq!(concrete.url.as_str(), "https://body.example/gql");
        let body = body_json(&concrete);
        assert_eq!(body["variables"]["accessToken"], "tok-1");
        assert_eq!(body["variables"]["first"], 20);
        assert!(body["query"].is_string());
    }

    #[test]
    fn test_body_embedded_auth_extensions() {
        let endpoint = RelayEndpoint::new(
            "body",
            "https://body.example",
            3,
            RelayKind::BodyEmbeddedAuth {
                field: BodyAuthField::Extensions,
                key: "token".into(),
                query_param: "access_token".into(),
            },
        );

        let concrete = transformer().transform(&endpoint, &graphql_request()).unwrap();
        assert!(concrete.headers.get(AUTHORIZATION).is_none());
        assert_eq!(concrete.method, Method::POST);
        let body = body_json(&concrete);
        assert_eq!(body["extensions"]["token"], "tok-1");
        assert!(body["variables"].get("token").is_none());
        assert_eq!(body["variables"]["first"], 20);

        let rest = LogicalRequest::get("/members/123").with_bearer("tok-3").unwrap();
        let concrete = transformer().transform(&endpoint, &rest).unwrap();
        assert!(concrete.headers.get(AUTHORIZATION).is_none());
        assert_eq!(concrete.method, Method::GET);
        assert!(concrete.body.is_none());
        assert_eq!(
            concrete.url.as_str(),
            "https://body.example/members/123?access_token=tok-3"
        );
    }

    #[test]
    fn test_cookies_dropped_without_credentials() {
        let endpoint = RelayEndpoint::new("edge", "https://relay.example", 1, RelayKind::Direct);
        let req = LogicalRequest::get("/x").with_header(COOKIE, HeaderValue::from_static("sid=1"));
        let concrete = transformer().transform(&endpoint, &req).unwrap();
        assert!(concrete.headers.get(COOKIE).is_none());

        let trusted = RelayEndpoint::new("edge", "https://relay.example", 1, RelayKind::Direct)
            .with_credentials(true);
        let concrete = transformer().transform(&trusted, &req).unwrap();
        assert_eq!(concrete.headers.get(COOKIE).unwrap(), "sid=1");
    }

    #[test]
    fn test_probe_shapes() {
        let t = transformer();
        let worker = RelayEndpoint::new(
            "worker",
            "https://worker.example",
            1,
            RelayKind::PathPrefix { prefix: "/proxy".into() },
        );
        let probe = t.probe_request(&worker, "/status").unwrap();
        assert_eq!(probe.method, Method::OPTIONS);
        assert_eq!(probe.url.as_str(), "https://worker.example/proxy/status");
        assert!(probe.headers.contains_key("access-control-request-method"));

        let query = RelayEndpoint::new(
            "allorigins",
            "https://relay.example/raw",
            2,
            RelayKind::QueryParam {
                target_param: "url".into(),
                auth_param: "authorization".into(),
            },
        );
        let probe = t.probe_request(&query, "/status").unwrap();
        assert_eq!(probe.method, Method::GET);
        assert_eq!(
            probe.url.query_pairs().next().unwrap().1,
            "https://api.meetup.com/status"
        );
    }
}
