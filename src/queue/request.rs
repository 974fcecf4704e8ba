//! Queued request record and the caller's handle to its outcome.

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::GateError;

/// A re-invocable unit of work. Called once per attempt.
pub type Operation<T> = Box<dyn FnMut() -> BoxFuture<'static, Result<T, GateError>> + Send>;

/// Per-submission options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Higher is served first.
    pub priority: i32,
    /// Maximum wait for a slot; `None` uses the queue's default.
    pub timeout: Option<Duration>,
}

impl EnqueueOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A request waiting for a concurrency slot.
pub(crate) struct QueuedRequest<T> {
    pub id: u64,
    pub priority: i32,
    pub enqueued_at: Instant,
    pub deadline: Instant,
    pub operation: Operation<T>,
    responder: oneshot::Sender<Result<T, GateError>>,
    timeout_task: Option<AbortHandle>,
}

impl<T> std::fmt::Debug for QueuedRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl<T> QueuedRequest<T> {
    pub fn new(
        id: u64,
        priority: i32,
        timeout: Duration,
        operation: Operation<T>,
        responder: oneshot::Sender<Result<T, GateError>>,
    ) -> Self {
        let enqueued_at = Instant::now();
        Self {
            id,
            priority,
            enqueued_at,
            deadline: enqueued_at + timeout,
            operation,
            responder,
            timeout_task: None,
        }
    }

    pub fn set_timeout_task(&mut self, handle: AbortHandle) {
        self.timeout_task = Some(handle);
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.deadline
    }

    /// Cancel the pending timeout timer; the request is leaving the waiting list.
    pub fn disarm(&mut self) {
        if let Some(handle) = self.timeout_task.take() {
            handle.abort();
        }
    }

    /// Complete the request with an error without running it.
    pub fn fail(mut self, err: GateError) {
        self.disarm();
        let _ = self.responder.send(Err(err));
    }

    /// Split into the pieces the executor needs.
    pub fn into_parts(mut self) -> (Operation<T>, oneshot::Sender<Result<T, GateError>>) {
        self.disarm();
        (self.operation, self.responder)
    }
}

/// Handle returned on admission. Await [`Ticket::outcome`] for the result.
#[derive(Debug)]
pub struct Ticket<T> {
    id: u64,
    receiver: oneshot::Receiver<Result<T, GateError>>,
}

impl<T> Ticket<T> {
    pub(crate) fn new(id: u64, receiver: oneshot::Receiver<Result<T, GateError>>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn outcome(self) -> Result<T, GateError> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(GateError::Shutdown),
        }
    }
}
