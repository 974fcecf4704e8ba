//! Queue counters.

use serde::Serialize;

/// Monotonic counters. Best-effort observability, not part of the contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct QueueCounters {
    pub processed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub rejected: u64,
    pub cleared: u64,
}

/// Snapshot returned by `RequestQueue::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Requests waiting for a slot.
    pub waiting: usize,
    /// Requests currently executing.
    pub active: usize,
    pub processed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub rejected: u64,
    pub cleared: u64,
}

impl QueueStats {
    pub(crate) fn new(waiting: usize, active: usize, counters: QueueCounters) -> Self {
        Self {
            waiting,
            active,
            processed: counters.processed,
            failed: counters.failed,
            timed_out: counters.timed_out,
            rejected: counters.rejected,
            cleared: counters.cleared,
        }
    }
}
