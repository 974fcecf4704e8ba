//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event, never formatted-in values
//! - Metric calls are no-ops until a recorder is installed, so library users
//!   and tests pay nothing
//! - Request ID flows from the HTTP layer to the upstream call

pub mod logging;
pub mod metrics;
