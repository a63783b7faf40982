//! Declarative relay kinds.

use reqwest::Method;
use serde::{Deserialize, Serialize};

/// How a relay expects requests to be shaped.
///
/// Each variant is plain data; the rewriting itself lives in
/// [`RequestTransformer`](super::RequestTransformer).
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayKind {
    /// Pass-through: the logical path is appended to the relay's base URL.
    #[default]
    Direct,

    /// `<base><prefix><path>`, bearer credential kept in `Authorization`.
    PathPrefix { prefix: String },

    /// `<base>?<target_param>=<upstream url>`. The relay cannot validate
    /// headers, so the token travels in the GraphQL body extensions or, for
    /// REST calls, as `<auth_param>` in the query string.
    QueryParam {
        target_param: String,
        auth_param: String,
    },

    /// `<base><path>`, token embedded in the GraphQL body under
    /// `<field>.<key>`, or as `<query_param>` for REST calls.
    BodyEmbeddedAuth {
        field: BodyAuthField,
        key: String,
        query_param: String,
    },
}

/// GraphQL body member that carries an embedded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyAuthField {
    Variables,
    Extensions,
}

impl BodyAuthField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyAuthField::Variables => "variables",
            BodyAuthField::Extensions => "extensions",
        }
    }
}

impl RelayKind {
    /// Whether the `Authorization` header survives the rewrite.
    pub fn forwards_auth_header(&self) -> bool {
        matches!(self, RelayKind::Direct | RelayKind::PathPrefix { .. })
    }

    /// Method used for health probes. Query-parameter relays cannot answer
    /// `OPTIONS`, so they are probed with `GET`.
    pub fn probe_method(&self) -> Method {
        match self {
            RelayKind::QueryParam { .. } => Method::GET,
            _ => Method::OPTIONS,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            RelayKind::Direct => "direct",
            RelayKind::PathPrefix { .. } => "path_prefix",
            RelayKind::QueryParam { .. } => "query_param",
            RelayKind::BodyEmbeddedAuth { .. } => "body_embedded_auth",
        }
    }
}
