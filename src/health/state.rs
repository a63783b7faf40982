//! Relay health state.
//!
//! # States
//! - Healthy: relay is eligible for selection
//! - Unhealthy: relay is skipped until its cooldown elapses and a probe passes
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: failure signal during a call, or failed probe
//! Unhealthy → Healthy: probe passes after cooldown, or manual reset
//! ```
//!
//! Every write bumps a generation counter. A probe remembers the generation
//! it started from and is discarded if anything else wrote in the meantime,
//! so a slow healthy probe never overrides a newer failure report.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Point-in-time view of a relay's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthRecord {
    pub healthy: bool,
    pub last_checked_at: Option<Instant>,
    pub generation: u64,
}

/// Health record guarded for per-relay serialised writes.
#[derive(Debug)]
pub struct HealthCell {
    record: Mutex<HealthRecord>,
}

impl Default for HealthCell {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCell {
    pub fn new() -> Self {
        Self {
            record: Mutex::new(HealthRecord {
                healthy: true,
                last_checked_at: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HealthRecord> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> HealthRecord {
        *self.lock()
    }

    /// Unhealthy and its cooldown has elapsed.
    pub fn is_due(&self, cooldown: Duration, now: Instant) -> bool {
        let record = self.lock();
        !record.healthy
            && record
                .last_checked_at
                .map_or(true, |at| now.saturating_duration_since(at) >= cooldown)
    }

    /// Unconditional write. Returns true if the healthy flag flipped.
    pub(crate) fn set(&self, healthy: bool, now: Instant) -> bool {
        let mut record = self.lock();
        let changed = record.healthy != healthy;
        record.healthy = healthy;
        record.last_checked_at = Some(now);
        record.generation += 1;
        changed
    }

    /// Apply a probe verdict observed against `generation`.
    ///
    /// Returns `None` if a newer write happened since the probe started.
    pub(crate) fn apply_probe(&self, generation: u64, healthy: bool, now: Instant) -> Option<bool> {
        let mut record = self.lock();
        if record.generation != generation {
            return None;
        }
        let changed = record.healthy != healthy;
        record.healthy = healthy;
        record.last_checked_at = Some(now);
        record.generation += 1;
        Some(changed)
    }
}
