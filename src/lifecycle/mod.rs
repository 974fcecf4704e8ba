//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() → HTTP server stops accepting and drains
//!               → dedup sweeper exits its loop
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown out to every background task
//! - In-flight AI calls finish; only new admissions stop

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
