//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: probing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: on the first call after `timeout` has elapsed
//! Half-Open → Closed: successes >= success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - Open → Half-Open is evaluated lazily on the next call, no background timer
//! - Fail fast in Open state: the wrapped operation is never invoked
//! - No retries here; the request queue owns retry policy

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::error::GateError;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker, for stats endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failures: u32,
    pub successes: u32,
    /// Milliseconds since the last recorded failure, if any.
    pub since_last_failure_ms: Option<u64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
}

/// Guards one downstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `operation` through the breaker.
    ///
    /// Returns `GateError::CircuitOpen` without calling `operation` while the
    /// circuit is open; otherwise returns the operation's own outcome.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GateError>>,
    {
        self.admit()?;

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure(&err);
                Err(err)
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failures: inner.failures,
            successes: inner.successes,
            since_last_failure_ms: inner.last_failure.map(|t| t.elapsed().as_millis() as u64),
        }
    }

    /// Force the circuit closed with all counters zeroed.
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed);
        inner.failures = 0;
        inner.successes = 0;
        inner.last_failure = None;
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }

    fn admit(&self) -> Result<(), GateError> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let cooled_down = inner
            .last_failure
            .map_or(true, |t| t.elapsed() >= self.config.timeout());
        if cooled_down {
            self.transition(&mut inner, CircuitState::HalfOpen);
            inner.successes = 0;
            Ok(())
        } else {
            metrics::record_breaker_rejection(&self.name);
            Err(GateError::CircuitOpen)
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.failures = 0,
            CircuitState::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed);
                    inner.failures = 0;
                    inner.successes = 0;
                }
            }
            // A call admitted before another caller tripped the circuit.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, err: &GateError) {
        let mut inner = self.lock();
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.failure_threshold {
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.failures,
                        error = %err,
                        "Failure threshold reached"
                    );
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.failures += 1;
                tracing::warn!(breaker = %self.name, error = %err, "Probe failed");
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        if inner.state == to {
            return;
        }
        tracing::info!(
            breaker = %self.name,
            from = inner.state.as_str(),
            to = to.as_str(),
            "Circuit breaker state change"
        );
        metrics::record_breaker_transition(&self.name, to.as_str());
        inner.state = to;
    }
}
