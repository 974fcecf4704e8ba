//! AI request admission gateway library.
//!
//! Admission control in front of a rate-limited AI provider: a priority
//! queue with a concurrency bound, per-request wait deadlines and retry
//! with backoff; a circuit breaker; and a deduplicator that collapses
//! identical in-flight calls.

// Admission core
pub mod admission;
pub mod dedup;
pub mod error;
pub mod queue;
pub mod resilience;

// Service surface
pub mod admin;
pub mod http;
pub mod upstream;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use admission::{AdmissionController, AdmissionSnapshot, RunOptions};
pub use config::schema::GateConfig;
pub use error::{ErrorKind, GateError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
