//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::retries::RetryPolicy;

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Request queue (admission control) settings.
    pub queue: QueueConfig,

    /// Circuit breaker guarding the upstream AI provider.
    pub breaker: BreakerConfig,

    /// Request deduplication settings.
    pub dedup: DedupConfig,

    /// Upstream AI provider.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time a single HTTP request may take, queue wait included.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 120,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Request queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on simultaneously executing operations.
    pub max_concurrent: usize,

    /// Upper bound on waiting requests before submissions are rejected.
    pub max_queue_size: usize,

    /// How long a request may wait for a slot, in milliseconds.
    pub default_timeout_ms: u64,

    /// Priority used when the caller does not supply one.
    pub default_priority: i32,

    /// Retries after the first failed attempt.
    pub retry_attempts: u32,

    /// Backoff base in milliseconds; retry `i` waits `retry_delay_ms * 2^i`.
    pub retry_delay_ms: u64,

    /// Backoff ceiling in milliseconds.
    pub max_retry_delay_ms: u64,

    /// Extra random delay as a fraction of the backoff (0.0 = none).
    pub jitter_ratio: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_queue_size: 100,
            default_timeout_ms: 30_000,
            default_priority: 0,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            max_retry_delay_ms: 30_000,
            jitter_ratio: 0.0,
        }
    }
}

impl QueueConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            jitter_ratio: self.jitter_ratio,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures (while closed) that open the circuit.
    pub failure_threshold: u32,

    /// Successful probes (while half-open) that close the circuit.
    pub success_threshold: u32,

    /// Cool-down before an open circuit admits a probe, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_ms: 60_000,
        }
    }
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Request deduplication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// How long a pending entry may be joined by new callers, in milliseconds.
    pub ttl_ms: u64,

    /// Delay between settlement and removal of an entry, in milliseconds.
    pub grace_ms: u64,

    /// Interval of the stale-entry sweep, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5_000,
            grace_ms: 100,
            sweep_interval_secs: 60,
        }
    }
}

impl DedupConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Upstream AI provider (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider base URL; `/v1/chat/completions` is appended.
    pub base_url: String,

    /// Bearer token. May be supplied via `AI_GATE_UPSTREAM_API_KEY` instead.
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Model requested for every completion.
    pub model: String,

    /// Completion length cap.
    pub max_tokens: u32,

    /// Per-attempt HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            request_timeout_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    #[serde(skip_serializing)]
    pub api_key: String,
}

/// Placeholder admin key; validation refuses it when the admin API is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
        }
    }
}
