//! Admission controller: one entry point over the three admission layers.
//!
//! ```text
//! run(options, operation)
//!     → dedup_key set? → join an identical in-flight call
//!     → queue (priority, concurrency bound, wait deadline, retries)
//!         → circuit breaker (per attempt) → operation()
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::GateConfig;
use crate::dedup::{DedupStats, RequestDeduplicator};
use crate::error::GateError;
use crate::queue::{EnqueueOptions, QueueStats, RequestQueue};
use crate::resilience::{BreakerSnapshot, CircuitBreaker};

const UPSTREAM_BREAKER: &str = "upstream";

/// Per-call admission options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Calls sharing a key while one is in flight share its outcome.
    pub dedup_key: Option<String>,
    pub priority: i32,
    /// Maximum queue wait; `None` uses the queue default.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmissionSnapshot {
    pub queue: QueueStats,
    pub breaker: BreakerSnapshot,
    pub dedup: DedupStats,
}

pub struct AdmissionController<T> {
    queue: RequestQueue<T>,
    breaker: Arc<CircuitBreaker>,
    dedup: RequestDeduplicator<T>,
}

impl<T> Clone for AdmissionController<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            breaker: Arc::clone(&self.breaker),
            dedup: self.dedup.clone(),
        }
    }
}

impl<T> AdmissionController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(queue: RequestQueue<T>, breaker: CircuitBreaker, dedup: RequestDeduplicator<T>) -> Self {
        Self {
            queue,
            breaker: Arc::new(breaker),
            dedup,
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(
            RequestQueue::new(config.queue.clone()),
            CircuitBreaker::new(UPSTREAM_BREAKER, config.breaker.clone()),
            RequestDeduplicator::new(config.dedup.clone()),
        )
    }

    /// Run `operation` through dedup, the queue and the breaker.
    ///
    /// `operation` may be called more than once when the queue retries.
    pub async fn run<F, Fut>(&self, options: RunOptions, operation: F) -> Result<T, GateError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, GateError>> + Send + 'static,
    {
        let enqueue = EnqueueOptions {
            priority: options.priority,
            timeout: options.timeout,
        };
        let queue = self.queue.clone();
        let breaker = Arc::clone(&self.breaker);
        let operation = Arc::new(operation);

        let admitted = async move {
            queue
                .enqueue(
                    move || {
                        let breaker = Arc::clone(&breaker);
                        let operation = Arc::clone(&operation);
                        async move { breaker.execute(|| (*operation)()).await }
                    },
                    enqueue,
                )
                .await
        };

        match options.dedup_key {
            Some(key) => self.dedup.execute(&key, move || admitted).await,
            None => admitted.await,
        }
    }

    pub fn queue(&self) -> &RequestQueue<T> {
        &self.queue
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn deduplicator(&self) -> &RequestDeduplicator<T> {
        &self.dedup
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            queue: self.queue.stats(),
            breaker: self.breaker.snapshot(),
            dedup: self.dedup.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time;

    use crate::resilience::CircuitState;

    fn controller(retry_attempts: u32) -> AdmissionController<String> {
        let mut config = GateConfig::default();
        config.queue.max_concurrent = 1;
        config.queue.retry_attempts = retry_attempts;
        config.queue.retry_delay_ms = 10;
        config.breaker.failure_threshold = 2;
        AdmissionController::from_config(&config)
    }

    fn keyed(key: &str) -> RunOptions {
        RunOptions {
            dedup_key: Some(key.to_string()),
            ..RunOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_operation_value() {
        let gate = controller(0);
        let value = gate
            .run(RunOptions::default(), || async { Ok("done".to_string()) })
            .await;
        assert_eq!(value, Ok("done".to_string()));
        assert_eq!(gate.snapshot().queue.processed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_executes_once() {
        let gate = controller(0);
        let calls = Arc::new(AtomicU32::new(0));

        let make = |calls: Arc<AtomicU32>| {
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    time::sleep(Duration::from_millis(50)).await;
                    Ok("shared".to_string())
                }
            }
        };

        let (a, b) = tokio::join!(
            gate.run(keyed("same"), make(calls.clone())),
            gate.run(keyed("same"), make(calls.clone())),
        );

        assert_eq!(a, Ok("shared".to_string()));
        assert_eq!(b, Ok("shared".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.snapshot().dedup.hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opens_and_short_circuits() {
        let gate = controller(0);
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result = gate
                .run(RunOptions::default(), move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<String, _>(GateError::operation("upstream returned 503"))
                    }
                })
                .await;
            assert!(result.is_err());
        }
        assert_eq!(gate.breaker().state(), CircuitState::Open);

        let calls_before = calls.load(Ordering::SeqCst);
        let rejected = {
            let calls = calls.clone();
            gate.run(RunOptions::default(), move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("unreachable".to_string())
                }
            })
            .await
        };
        assert_eq!(rejected, Err(GateError::CircuitOpen));
        assert_eq!(calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried_through_breaker() {
        let gate = controller(2);
        let calls = Arc::new(AtomicU32::new(0));

        let result = {
            let calls = calls.clone();
            gate.run(RunOptions::default(), move || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(GateError::operation("connection reset"))
                    } else {
                        Ok("recovered".to_string())
                    }
                }
            })
            .await
        };

        assert_eq!(result, Ok("recovered".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(gate.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_serializes() {
        let gate = controller(0);
        let json = serde_json::to_value(gate.snapshot()).unwrap();
        assert_eq!(json["breaker"]["state"], "closed");
        assert_eq!(json["queue"]["waiting"], 0);
        assert_eq!(json["dedup"]["entries"], 0);
    }
}
