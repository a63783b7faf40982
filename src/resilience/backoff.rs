//! Exponential backoff with jitter between relay fallback attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Delay before fallback attempt number `failures + 1`.
///
/// `base * 2^(failures-1)`, capped at `max`, plus up to 10% jitter.
pub fn calculate_backoff(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(failures - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// [`calculate_backoff`] with the configured bounds.
pub fn fallback_delay(failures: u32, config: &RetryConfig) -> Duration {
    calculate_backoff(failures, config.base_delay_ms, config.max_delay_ms)
}
