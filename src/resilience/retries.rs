//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is worth retrying
//! - Re-run an operation with exponential backoff until the budget is spent
//!
//! Failures carry a structured [`ErrorKind`]. Operations that only have a
//! message get one through [`classify_message`], which keeps the historical
//! substring rules: invalid input, unauthorized, forbidden, not found and bad
//! request are never retried.

use std::future::Future;
use std::time::Duration;

use crate::error::{ErrorKind, GateError};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Message fragments (lowercase, separators normalized to spaces) that mark a
/// failure as permanent.
const NON_RETRYABLE_PATTERNS: &[(&str, ErrorKind)] = &[
    ("invalid", ErrorKind::InvalidInput),
    ("unauthorized", ErrorKind::Unauthorized),
    ("forbidden", ErrorKind::Forbidden),
    ("not found", ErrorKind::NotFound),
    ("bad request", ErrorKind::BadRequest),
];

/// Classify a failure message. Case-insensitive; `not-found` and
/// `bad_request` match like their spaced forms.
pub fn classify_message(message: &str) -> ErrorKind {
    let normalized: String = message
        .chars()
        .map(|c| match c {
            '-' | '_' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    NON_RETRYABLE_PATTERNS
        .iter()
        .find(|(pattern, _)| normalized.contains(pattern))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Transient)
}

/// Only transient operation failures are retried. Admission errors
/// (queue full, timeout, cleared, breaker open) surface immediately.
pub fn is_retryable(err: &GateError) -> bool {
    match err {
        GateError::Operation { kind, .. } => kind.is_retryable(),
        _ => false,
    }
}

/// Retry budget and backoff shape for one operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            attempts: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_ratio: 0.0,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base_delay, self.max_delay, self.jitter_ratio)
    }

    /// Run `operation`, retrying transient failures. The last error is
    /// returned once the budget is exhausted.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, GateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GateError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if retry < self.attempts && is_retryable(&err) => {
                    let delay = self.delay_for(retry);
                    tracing::info!(
                        attempt = retry + 1,
                        max_attempts = self.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying operation"
                    );
                    metrics::record_retry();
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
