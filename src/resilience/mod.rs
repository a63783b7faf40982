//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relay call:
//!     → timeouts.rs (deadline on every call and probe)
//!     → relay fault: backoff.rs (jittered delay before the next relay)
//!     → rate limit: rate_limit.rs (wait for the upstream reset, retry once)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Backoff between relays is jittered
//! - A rate limit is a pause, never a health penalty

pub mod backoff;
pub mod rate_limit;
pub mod timeouts;
