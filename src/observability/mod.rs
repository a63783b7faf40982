//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, health tracker, network layer, relay server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!     → spans.rs (one span per logical call, with a call ID)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`relay`, `attempt`, `status`) rather than prose
//! - Metrics are cheap; without an installed exporter they are no-ops
//! - Tokens and relay query strings are never logged

pub mod logging;
pub mod metrics;
pub mod spans;
