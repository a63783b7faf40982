//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem it finds, not just the first.

use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::schema::RelayProxyConfig;

/// Upper bound on relay attempts per logical call.
pub const MAX_RELAY_ATTEMPTS: u32 = 5;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &RelayProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Url::parse(&config.upstream.base_url).is_err() {
        errors.push(ValidationError::new("upstream.base_url", "not a valid URL"));
    }
    for (field, path) in [
        ("upstream.graphql_path", &config.upstream.graphql_path),
        ("upstream.status_path", &config.upstream.status_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }

    if config.relays.is_empty() {
        errors.push(ValidationError::new("relays", "at least one relay is required"));
    }

    let mut seen_urls = HashSet::new();
    let mut seen_names = HashSet::new();
    for (i, relay) in config.relays.iter().enumerate() {
        let field = format!("relays[{}]", i);
        match Url::parse(&relay.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => errors.push(ValidationError::new(
                format!("{field}.base_url"),
                "scheme must be http or https",
            )),
            Err(_) => errors.push(ValidationError::new(
                format!("{field}.base_url"),
                "not a valid URL",
            )),
        }
        if !seen_urls.insert(relay.base_url.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                format!("{field}.base_url"),
                "duplicate relay base URL",
            ));
        }
        if !seen_names.insert(relay.name.as_str()) {
            errors.push(ValidationError::new(format!("{field}.name"), "duplicate relay name"));
        }
    }

    if config.retries.max_attempts == 0 || config.retries.max_attempts > MAX_RELAY_ATTEMPTS {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            format!("must be between 1 and {}", MAX_RELAY_ATTEMPTS),
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::new("health_check.timeout_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.rate_limit.min_wait_secs > config.rate_limit.max_wait_secs {
        errors.push(ValidationError::new(
            "rate_limit.min_wait_secs",
            "must not exceed rate_limit.max_wait_secs",
        ));
    }

    if config.server.request_timeout_secs <= config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must exceed timeouts.request_secs",
        ));
    }

    if !config.server.path_prefix.starts_with('/') {
        errors.push(ValidationError::new("server.path_prefix", "must start with '/'"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
