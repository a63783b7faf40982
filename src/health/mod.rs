//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive (passive.rs):
//!     Relay fault observed during a call
//!     → tracker.rs marks the relay unhealthy
//!
//! Active (active.rs):
//!     Registry selection finds an unhealthy relay past its cooldown
//!     → tracker.rs probes it
//!     → verdict written to state.rs (unless superseded)
//!
//! State (state.rs):
//!     Healthy ←→ Unhealthy, with a cooldown gate on re-checks
//! ```
//!
//! # Design Decisions
//! - The tracker is the only writer of health
//! - Health state is per relay and serialised per relay
//! - Probe errors resolve to "unhealthy", never to an error

pub mod active;
pub mod passive;
pub mod state;
pub mod tracker;

pub use passive::FailurePolicy;
pub use state::{HealthCell, HealthRecord};
pub use tracker::HealthTracker;
