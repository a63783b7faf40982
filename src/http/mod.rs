//! Edge relay HTTP server.
//!
//! # Data Flow
//! ```text
//! browser / relay client
//!     → server.rs (Axum router, request ID, timeout, trace)
//!     → OPTIONS: response.rs preflight
//!     → GET/POST <prefix>/<path>: forward to upstream host
//!     → response.rs (relayed JSON body or error envelope, CORS headers)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{RelayServer, RelayState};
