//! Relay registry subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call → network layer
//!     → pool.rs: re-check relays past cooldown (health tracker)
//!     → pick lowest priority value among healthy relays
//!     → endpoint.rs: relay description handed to the transformer
//!     → None when every relay is unhealthy
//! ```
//!
//! # Design Decisions
//! - The relay set is fixed at construction; no dynamic add/remove
//! - The registry is an explicit object shared by `Arc`, never a global
//! - Ties in priority resolve to registration order

pub mod endpoint;
pub mod pool;

pub use endpoint::{EndpointStatus, RelayEndpoint};
pub use pool::RelayRegistry;
