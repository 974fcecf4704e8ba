//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges, addresses and URLs.
//! Every violation is collected so an operator sees them all at once.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GateConfig, PLACEHOLDER_ADMIN_KEY};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }

    let queue = &config.queue;
    if queue.max_concurrent == 0 {
        errors.push(ValidationError::new("queue.max_concurrent", "must be greater than 0"));
    }
    if queue.max_queue_size == 0 {
        errors.push(ValidationError::new("queue.max_queue_size", "must be greater than 0"));
    }
    if queue.default_timeout_ms == 0 {
        errors.push(ValidationError::new("queue.default_timeout_ms", "must be greater than 0"));
    }
    if queue.retry_delay_ms > queue.max_retry_delay_ms {
        errors.push(ValidationError::new(
            "queue.retry_delay_ms",
            "must not exceed queue.max_retry_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&queue.jitter_ratio) {
        errors.push(ValidationError::new("queue.jitter_ratio", "must be within 0.0..=1.0"));
    }

    let breaker = &config.breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("breaker.failure_threshold", "must be greater than 0"));
    }
    if breaker.success_threshold == 0 {
        errors.push(ValidationError::new("breaker.success_threshold", "must be greater than 0"));
    }
    if breaker.timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.timeout_ms", "must be greater than 0"));
    }

    if config.dedup.ttl_ms == 0 {
        errors.push(ValidationError::new("dedup.ttl_ms", "must be greater than 0"));
    }
    if config.dedup.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("dedup.sweep_interval_secs", "must be greater than 0"));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }
    if config.upstream.model.trim().is_empty() {
        errors.push(ValidationError::new("upstream.model", "must not be empty"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_secs", "must be greater than 0"));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY)
    {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must be set to a real secret when the admin API is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
