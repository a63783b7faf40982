//! Upstream rate-limit detection.
//!
//! Two signals are recognised:
//! - a GraphQL error whose `extensions.code` equals the configured code
//!   (default `RATE_LIMITED`), optionally carrying `extensions.resetAt`
//!   as RFC 3339 text or epoch seconds/milliseconds
//! - HTTP 429, optionally with `Retry-After` in seconds
//!
//! A rate limit is not a relay fault: the call waits, then retries once.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;

use crate::config::RateLimitConfig;

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// A rate-limit response from the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// Time until the limit resets, if the upstream said.
    pub reset_after: Option<Duration>,
    pub message: String,
}

/// Look for a rate-limit error in a GraphQL response body.
pub fn detect_graphql(body: &Value, code: &str, now: DateTime<Utc>) -> Option<RateLimitSignal> {
    let errors = body.get("errors")?.as_array()?;
    errors.iter().find_map(|error| {
        let error_code = error
            .pointer("/extensions/code")
            .or_else(|| error.get("code"))
            .and_then(Value::as_str)?;
        if error_code != code {
            return None;
        }
        let reset_after = error
            .pointer("/extensions/resetAt")
            .or_else(|| error.get("resetAt"))
            .and_then(|v| parse_reset_at(v, now));
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("rate limited")
            .to_string();
        Some(RateLimitSignal {
            reset_after,
            message,
        })
    })
}

/// Signal for an HTTP 429 response.
pub fn from_http_429(headers: &HeaderMap, body: &str) -> RateLimitSignal {
    let reset_after = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = if body.trim().is_empty() {
        "too many requests".to_string()
    } else {
        body.trim().to_string()
    };
    RateLimitSignal {
        reset_after,
        message,
    }
}

/// Time from `now` until the reset timestamp in `value`. Past resets yield zero.
pub fn parse_reset_at(value: &Value, now: DateTime<Utc>) -> Option<Duration> {
    let reset = match value {
        Value::String(text) => match DateTime::parse_from_rfc3339(text) {
            Ok(at) => at.with_timezone(&Utc),
            Err(_) => from_epoch(text.trim().parse::<i64>().ok()?)?,
        },
        Value::Number(n) => from_epoch(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?)?,
        _ => return None,
    };
    Some((reset - now).to_std().unwrap_or(Duration::ZERO))
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// How long to suspend before the single rate-limit retry.
///
/// Known resets are rounded up to whole seconds; unknown ones use the
/// configured minimum window. Both are capped at the configured maximum.
pub fn wait_duration(reset_after: Option<Duration>, config: &RateLimitConfig) -> Duration {
    let max = Duration::from_secs(config.max_wait_secs);
    let wait = match reset_after {
        Some(d) if d.subsec_nanos() > 0 => Duration::from_secs(d.as_secs() + 1),
        Some(d) => d,
        None => Duration::from_secs(config.min_wait_secs),
    };
    wait.min(max)
}
