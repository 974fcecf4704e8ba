//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Operation submitted to the queue:
//!     → retries.rs (classify failure, retry with backoff)
//!         → backoff.rs (delay for retry i = base * 2^i)
//!     → circuit_breaker.rs (fail fast while the dependency is down)
//! ```
//!
//! # Design Decisions
//! - Permanent failures (bad input, auth) never consume retry budget
//! - Circuit breaker prevents hammering a failing provider
//! - Breaker and retry policy are independent and composable

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retries::{classify_message, is_retryable, RetryPolicy};
