//! GraphQL network layer.
//!
//! # Data Flow
//! ```text
//! caller (GraphQL or REST intent)
//!     → layer.rs: validate, select relay, transform
//!     → transport.rs: execute concrete request
//!     → outcome.rs: Success | RelayFailure | UpstreamError | RateLimited
//!     → layer.rs: return, fall back, or wait and retry
//! ```

pub mod layer;
pub mod outcome;
pub mod transport;

pub use layer::NetworkLayer;
pub use outcome::{ApiResponse, Outcome};
pub use transport::{HttpTransport, RawResponse, Transport};
