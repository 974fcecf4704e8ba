//! Upstream AI provider client.
//!
//! # Data Flow
//! ```text
//! AdmissionController attempt
//!     → client.rs (one chat-completion POST, no retries of its own)
//!     → status / transport failure → GateError with a structured kind
//! ```
//!
//! # Design Decisions
//! - Retries belong to the queue; the client makes exactly one attempt
//! - Permanent HTTP statuses map to non-retryable kinds, everything else is transient

pub mod client;

pub use client::{Completion, UpstreamClient, UpstreamError};
