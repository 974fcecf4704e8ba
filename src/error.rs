//! Error taxonomy shared by the queue, breaker and deduplicator.
//!
//! `GateError` is `Clone` because a deduplicated outcome is observed by
//! every caller that coalesced onto it.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::resilience::retries::classify_message;

/// Category of an operation failure.
///
/// Everything except `Transient` is surfaced without consuming retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("queue is full (max: {max})")]
    QueueFull { max: usize },

    #[error("request timed out in queue after {waited:?}")]
    QueueTimeout { waited: Duration },

    #[error("request cancelled: queue cleared")]
    QueueCleared,

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("{message}")]
    Operation { kind: ErrorKind, message: String },

    #[error("admission controller shut down")]
    Shutdown,
}

impl GateError {
    /// Operation failure classified from its message text.
    pub fn operation(message: impl Into<String>) -> Self {
        let message = message.into();
        GateError::Operation {
            kind: classify_message(&message),
            message,
        }
    }

    /// Operation failure whose category is already known to the caller.
    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        GateError::Operation {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            GateError::Operation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Stable machine-readable code, used for API bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::QueueFull { .. } => "queue_full",
            GateError::QueueTimeout { .. } => "queue_timeout",
            GateError::QueueCleared => "queue_cleared",
            GateError::CircuitOpen => "circuit_open",
            GateError::Operation { kind, .. } => kind.as_str(),
            GateError::Shutdown => "shutdown",
        }
    }
}
