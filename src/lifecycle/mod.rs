//! Process lifecycle.
//!
//! The relay server subscribes to a [`Shutdown`] broadcast and drains
//! in-flight requests once it fires. `wait_for_signal` fires it on
//! SIGINT/SIGTERM.

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
