//! Request deduplication subsystem.
//!
//! # Data Flow
//! ```text
//! execute(key, factory)
//!     → entry for key younger than ttl? → join its shared outcome
//!     → else factory() → publish as the entry for key
//!     → outcome settles → entry removed after a short grace delay
//!
//! sweeper (every sweep_interval):
//!     → drop entries older than 2 * ttl
//! ```
//!
//! # Design Decisions
//! - Outcomes are `futures::Shared`, so every joined caller gets a clone
//! - Removal is generation-checked; a replaced entry never evicts its successor
//! - The sweep is a safety net, not the primary eviction path

pub mod deduplicator;

pub use deduplicator::{DedupStats, RequestDeduplicator};
