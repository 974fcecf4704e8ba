//! Collapses concurrent calls that share a key into one execution.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::DedupConfig;
use crate::error::GateError;
use crate::observability::metrics;

type SharedOutcome<T> = Shared<BoxFuture<'static, Result<T, GateError>>>;

struct PendingEntry<T> {
    outcome: SharedOutcome<T>,
    created_at: Instant,
    /// Distinguishes a replaced entry from its successor under the same key.
    generation: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub entries: usize,
    /// Calls that joined an existing entry.
    pub hits: u64,
    /// Calls that started new work.
    pub misses: u64,
}

struct DedupInner<T> {
    config: DedupConfig,
    pending: DashMap<String, PendingEntry<T>>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Request deduplicator keyed by caller-supplied strings.
pub struct RequestDeduplicator<T> {
    inner: Arc<DedupInner<T>>,
}

impl<T> Clone for RequestDeduplicator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(config: DedupConfig) -> Self {
        Self {
            inner: Arc::new(DedupInner {
                config,
                pending: DashMap::new(),
                next_generation: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Join the pending outcome for `key` if it is younger than the TTL,
    /// otherwise start `factory()` and publish it under `key`.
    ///
    /// Every caller attached to an entry observes the same value or error.
    /// `factory` may itself call back into this deduplicator.
    pub async fn execute<F, Fut>(&self, key: &str, factory: F) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GateError>> + Send + 'static,
    {
        self.join_or_start(key, factory).await
    }

    fn join_or_start<F, Fut>(&self, key: &str, factory: F) -> SharedOutcome<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GateError>> + Send + 'static,
    {
        let ttl = self.inner.config.ttl();

        let (outcome, generation) = match self.inner.pending.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().created_at.elapsed() < ttl => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_dedup(true);
                tracing::debug!(key = %key, "Joining in-flight request");
                return entry.get().outcome.clone();
            }
            entry => {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                // Lazy: `factory` runs on first poll, after the shard guard is released.
                let outcome = async move { factory().await }.boxed().shared();
                let pending = PendingEntry {
                    outcome: outcome.clone(),
                    created_at: Instant::now(),
                    generation,
                };
                match entry {
                    Entry::Occupied(mut stale) => {
                        stale.insert(pending);
                    }
                    Entry::Vacant(vacant) => {
                        vacant.insert(pending);
                    }
                }
                (outcome, generation)
            }
        };

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_dedup(false);
        metrics::set_dedup_entries(self.inner.pending.len());
        self.schedule_removal(key.to_string(), generation, outcome.clone());
        outcome
    }

    /// Drive the outcome to completion, then drop the entry after the grace delay.
    fn schedule_removal(&self, key: String, generation: u64, outcome: SharedOutcome<T>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _ = outcome.await;
            time::sleep(inner.config.grace()).await;
            inner
                .pending
                .remove_if(&key, |_, entry| entry.generation == generation);
            metrics::set_dedup_entries(inner.pending.len());
        });
    }

    /// Remove entries older than twice the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let max_age = self.inner.config.ttl() * 2;
        let mut removed = 0;
        self.inner.pending.retain(|key, entry| {
            let keep = entry.created_at.elapsed() <= max_age;
            if !keep {
                tracing::debug!(key = %key, "Sweeping stale dedup entry");
                removed += 1;
            }
            keep
        });
        metrics::set_dedup_entries(self.inner.pending.len());
        removed
    }

    /// Periodically run [`sweep_expired`](Self::sweep_expired) until shutdown.
    pub fn spawn_sweeper(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let dedup = self.clone();
        tokio::spawn(async move {
            let interval = dedup.inner.config.sweep_interval();
            let mut ticker = time::interval_at(Instant::now() + interval, interval);

            tracing::info!(interval_secs = interval.as_secs(), "Dedup sweeper starting");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = dedup.sweep_expired();
                        if removed > 0 {
                            tracing::info!(removed, "Swept stale dedup entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Dedup sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.pending.is_empty()
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            entries: self.inner.pending.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}
