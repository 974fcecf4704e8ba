//! Request queue (admission control) subsystem.
//!
//! # Data Flow
//! ```text
//! submit(operation, priority, timeout)
//!     → waiting list full?  → QueueFull
//!     → insert by priority (FIFO among equals), arm deadline timer
//!     → drain: start while active < max_concurrent
//!         → expired while waiting → QueueTimeout
//!         → run with retry/backoff → outcome to Ticket
//!     → slot freed → drain again
//! ```
//!
//! # Design Decisions
//! - Deadlines bound queue wait only; running work is never preempted
//! - Deadline timers are aborted as soon as a request starts
//! - Completion goes through a oneshot channel, signalled exactly once

pub mod request;
pub mod scheduler;
pub mod stats;

pub use request::{EnqueueOptions, Operation, Ticket};
pub use scheduler::RequestQueue;
pub use stats::QueueStats;
