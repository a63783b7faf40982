//! Multi-relay proxy layer for a GraphQL/REST upstream.
//!
//! Calls go out through an ordered chain of relays. Each relay has its own
//! URL and auth conventions, a health state that is probed lazily, and a
//! failure predicate. A failing relay is marked unhealthy and the call falls
//! back to the next one; upstream rate limits are waited out once.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod network;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod transform;

pub use config::RelayProxyConfig;
pub use error::{RelayError, RelayResult, TransportError};
pub use http::RelayServer;
pub use lifecycle::Shutdown;
pub use network::{ApiResponse, NetworkLayer, RawResponse, Transport};
pub use registry::{RelayEndpoint, RelayRegistry};
pub use transform::{LogicalRequest, RelayKind, RequestTransformer};
