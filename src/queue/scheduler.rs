//! Priority-ordered request queue with a concurrency bound.
//!
//! Requests wait in a priority-sorted list and are started whenever a slot
//! is free, highest priority first, arrival order among equals. Each waiting
//! request carries a deadline; a timer task fails it if it is still waiting
//! when the deadline passes. Running requests are never preempted.
//!
//! Queue state lives behind a `std::sync::Mutex` that is only held for
//! synchronous bookkeeping, never across an `.await`.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::QueueConfig;
use crate::error::{ErrorKind, GateError};
use crate::observability::metrics;
use crate::queue::request::{EnqueueOptions, Operation, QueuedRequest, Ticket};
use crate::queue::stats::{QueueCounters, QueueStats};
use crate::resilience::retries::RetryPolicy;

/// Admission-controlled executor for asynchronous operations producing `T`.
pub struct RequestQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct QueueInner<T> {
    config: QueueConfig,
    retry: RetryPolicy,
    next_id: AtomicU64,
    state: Mutex<QueueState<T>>,
}

struct QueueState<T> {
    waiting: VecDeque<QueuedRequest<T>>,
    active: usize,
    counters: QueueCounters,
}

impl<T> QueueState<T> {
    fn publish_gauges(&self) {
        metrics::set_queue_depth(self.waiting.len(), self.active);
    }
}

impl<T: Send + 'static> RequestQueue<T> {
    pub fn new(config: QueueConfig) -> Self {
        let retry = config.retry_policy();
        Self {
            inner: Arc::new(QueueInner {
                config,
                retry,
                next_id: AtomicU64::new(1),
                state: Mutex::new(QueueState {
                    waiting: VecDeque::new(),
                    active: 0,
                    counters: QueueCounters::default(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Submit `operation` and wait for its outcome.
    pub async fn enqueue<F, Fut>(&self, operation: F, options: EnqueueOptions) -> Result<T, GateError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GateError>> + Send + 'static,
    {
        self.submit(operation, options)?.outcome().await
    }

    /// Admit `operation` without waiting for it.
    ///
    /// Fails immediately with `QueueFull` when the waiting list is at
    /// capacity. `operation` is called once per attempt.
    pub fn submit<F, Fut>(&self, mut operation: F, options: EnqueueOptions) -> Result<Ticket<T>, GateError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GateError>> + Send + 'static,
    {
        let max = self.inner.config.max_queue_size;
        let timeout = options.timeout.unwrap_or_else(|| self.inner.config.default_timeout());
        let boxed: Operation<T> = Box::new(move || operation().boxed());
        let (responder, receiver) = oneshot::channel();

        let id = {
            let mut state = self.inner.lock_state();
            if state.waiting.len() >= max {
                state.counters.rejected += 1;
                metrics::record_queue_rejected();
                tracing::warn!(max, priority = options.priority, "Queue full, rejecting request");
                return Err(GateError::QueueFull { max });
            }

            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            let request = QueuedRequest::new(id, options.priority, timeout, boxed, responder);

            // Behind every request of equal or higher priority.
            let index = state
                .waiting
                .iter()
                .position(|r| r.priority < options.priority)
                .unwrap_or(state.waiting.len());
            state.waiting.insert(index, request);
            state.publish_gauges();
            id
        };

        metrics::record_queue_admitted();
        tracing::debug!(id, priority = options.priority, timeout_ms = timeout.as_millis() as u64, "Request enqueued");

        QueueInner::drain(&self.inner);
        QueueInner::arm_timeout(&self.inner, id);

        Ok(Ticket::new(id, receiver))
    }

    /// Zero-based position of a waiting request, `None` once it started or completed.
    pub fn position(&self, id: u64) -> Option<usize> {
        self.inner.lock_state().waiting.iter().position(|r| r.id == id)
    }

    /// Fail every waiting request with `QueueCleared`. Running requests are untouched.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = {
            let mut state = self.inner.lock_state();
            let drained: Vec<_> = state.waiting.drain(..).collect();
            state.counters.cleared += drained.len() as u64;
            state.publish_gauges();
            drained
        };

        let count = drained.len();
        for request in drained {
            request.fail(GateError::QueueCleared);
        }
        if count > 0 {
            metrics::record_queue_cleared(count);
            tracing::warn!(count, "Queue cleared");
        }
        count
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.lock_state();
        QueueStats::new(state.waiting.len(), state.active, state.counters)
    }
}

impl<T: Send + 'static> QueueInner<T> {
    fn lock_state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().expect("request queue mutex poisoned")
    }

    /// Start as many waiting requests as free slots allow.
    fn drain(this: &Arc<Self>) {
        loop {
            let mut expired = Vec::new();
            let next = {
                let mut state = this.lock_state();
                let mut next = None;
                let now = Instant::now();
                while state.active < this.config.max_concurrent {
                    let Some(request) = state.waiting.pop_front() else {
                        break;
                    };
                    if request.is_expired(now) {
                        state.counters.timed_out += 1;
                        expired.push(request);
                        continue;
                    }
                    state.active += 1;
                    next = Some(request);
                    break;
                }
                state.publish_gauges();
                next
            };

            for request in expired {
                Self::fail_timed_out(request);
            }

            match next {
                Some(request) => Self::start(this, request),
                None => return,
            }
        }
    }

    fn start(this: &Arc<Self>, request: QueuedRequest<T>) {
        let id = request.id;
        let wait = request.enqueued_at.elapsed();
        metrics::record_queue_wait(wait);
        tracing::debug!(id, priority = request.priority, wait_ms = wait.as_millis() as u64, "Request started");

        let (mut operation, responder) = request.into_parts();
        let inner = Arc::clone(this);

        tokio::spawn(async move {
            let started = Instant::now();
            let attempts = inner.retry.run(|| operation());
            let outcome = match AssertUnwindSafe(attempts).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(GateError::with_kind(ErrorKind::Transient, "operation panicked")),
            };

            {
                let mut state = inner.lock_state();
                state.active -= 1;
                match &outcome {
                    Ok(_) => state.counters.processed += 1,
                    Err(_) => state.counters.failed += 1,
                }
                state.publish_gauges();
            }

            metrics::record_queue_completed(outcome.is_ok(), started.elapsed());
            if let Err(err) = &outcome {
                tracing::warn!(id, error = %err, "Request failed");
            }

            let _ = responder.send(outcome);
            Self::drain(&inner);
        });
    }

    /// Start the deadline timer for a request that is still waiting.
    fn arm_timeout(this: &Arc<Self>, id: u64) {
        let mut state = this.lock_state();
        let Some(request) = state.waiting.iter_mut().find(|r| r.id == id) else {
            return;
        };

        let deadline = request.deadline;
        let weak: Weak<Self> = Arc::downgrade(this);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(id);
            }
        });
        request.set_timeout_task(handle.abort_handle());
    }

    fn expire(&self, id: u64) {
        let request = {
            let mut state = self.lock_state();
            let Some(index) = state.waiting.iter().position(|r| r.id == id) else {
                return;
            };
            let request = state.waiting.remove(index);
            state.counters.timed_out += 1;
            state.publish_gauges();
            request
        };

        if let Some(request) = request {
            Self::fail_timed_out(request);
        }
    }

    fn fail_timed_out(request: QueuedRequest<T>) {
        let waited: Duration = request.enqueued_at.elapsed();
        tracing::warn!(id = request.id, waited_ms = waited.as_millis() as u64, "Request timed out in queue");
        metrics::record_queue_timeout();
        request.fail(GateError::QueueTimeout { waited });
    }
}
