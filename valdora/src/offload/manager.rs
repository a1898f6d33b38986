//! OffloadManager implementation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use super::policy::TimeoutPolicy;
use crate::metrics;

/// Identifies a background task: its kind plus a sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey {
    kind: SmolStr,
    id: u64,
}

impl OffloadKey {
    /// Kind of the task (`fetch`, `evict`, ...), used in logs and metric labels.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Sequence number, unique per manager.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct OffloadManagerInner {
    timeout_policy: TimeoutPolicy,
    tasks: DashMap<OffloadKey, JoinHandle<()>>,
    key_counter: AtomicU64,
}

/// Spawns and tracks background tasks.
///
/// Cloning is cheap; clones share the same task table.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Creates a manager applying `timeout_policy` to every task.
    pub fn new(timeout_policy: TimeoutPolicy) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                timeout_policy,
                tasks: DashMap::new(),
                key_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Policy applied to spawned tasks.
    pub fn timeout_policy(&self) -> TimeoutPolicy {
        self.inner.timeout_policy
    }

    fn next_key(&self, kind: impl Into<SmolStr>) -> OffloadKey {
        let id = self.inner.key_counter.fetch_add(1, Ordering::Relaxed);
        OffloadKey {
            kind: kind.into(),
            id,
        }
    }

    /// Spawns `task` under the given kind and returns its key.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> OffloadKey
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_with_policy(kind, self.inner.timeout_policy, task)
    }

    /// Like [`spawn`](Self::spawn), under `policy` instead of the manager's.
    ///
    /// For tasks whose duration is chosen by the caller, such as a deferred
    /// eviction, which the manager-wide timeout must not cut short.
    pub fn spawn_with_policy<F>(
        &self,
        kind: impl Into<SmolStr>,
        policy: TimeoutPolicy,
        task: F,
    ) -> OffloadKey
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = self.next_key(kind);
        let handle = self.spawn_inner(task, key.clone(), policy);
        // A task that already finished has removed itself; do not track it again.
        if !handle.is_finished() {
            self.inner.tasks.insert(key.clone(), handle);
        }
        metrics::record_offload_spawned(key.kind());
        key
    }

    /// Number of tracked tasks that are still running.
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.iter().filter(|e| !e.is_finished()).count()
    }

    /// Number of tracked tasks, finished or not.
    pub fn total_task_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Drops handles of finished tasks.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Aborts every running task.
    pub fn cancel_all(&self) {
        for entry in self.inner.tasks.iter() {
            entry.abort();
        }
    }

    /// Aborts one task. Returns `false` when it is no longer tracked.
    pub fn cancel(&self, key: &OffloadKey) -> bool {
        if let Some(entry) = self.inner.tasks.get(key) {
            entry.abort();
            true
        } else {
            false
        }
    }

    /// Whether the task is still running.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.inner.tasks.get(key).is_some_and(|h| !h.is_finished())
    }

    /// Waits until no task is tracked, including tasks spawned while waiting.
    pub async fn wait_all(&self) {
        self.wait_where(|_| true).await;
    }

    /// Waits for every task of one kind, including ones spawned while waiting.
    pub async fn wait_kind(&self, kind: &str) {
        self.wait_where(|key| key.kind() == kind).await;
    }

    async fn wait_where(&self, filter: impl Fn(&OffloadKey) -> bool) {
        loop {
            let keys: Vec<OffloadKey> = self
                .inner
                .tasks
                .iter()
                .filter(|entry| filter(entry.key()))
                .map(|entry| entry.key().clone())
                .collect();
            if keys.is_empty() {
                break;
            }
            for key in keys {
                if let Some((_, handle)) = self.inner.tasks.remove(&key)
                    && let Err(error) = handle.await
                    && error.is_panic()
                {
                    warn!(?key, "offload task panicked");
                }
            }
        }
    }

    /// Waits for every task, giving up after `timeout`.
    ///
    /// Returns `true` if all tasks completed in time.
    pub async fn wait_all_timeout(&self, timeout: std::time::Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(&self, task: F, key: OffloadKey, policy: TimeoutPolicy) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inner = self.inner.clone();
        let span = info_span!("offload_task", kind = %key.kind, id = key.id);

        match policy {
            TimeoutPolicy::None => tokio::spawn(
                async move {
                    let start = Instant::now();
                    task.await;
                    inner.tasks.remove(&key);
                    metrics::record_offload_completed(key.kind(), start.elapsed());
                }
                .instrument(span),
            ),
            TimeoutPolicy::Cancel(duration) => tokio::spawn(
                async move {
                    let start = Instant::now();
                    match tokio::time::timeout(duration, task).await {
                        Ok(()) => metrics::record_offload_completed(key.kind(), start.elapsed()),
                        Err(_) => {
                            warn!(?key, "offload task cancelled due to timeout");
                            metrics::record_offload_timeout(key.kind(), start.elapsed());
                        }
                    }
                    inner.tasks.remove(&key);
                }
                .instrument(span),
            ),
            TimeoutPolicy::Warn(duration) => tokio::spawn(
                async move {
                    let start = Instant::now();
                    task.await;
                    let elapsed = start.elapsed();
                    if elapsed > duration {
                        warn!(
                            ?key,
                            elapsed_ms = elapsed.as_millis() as u64,
                            threshold_ms = duration.as_millis() as u64,
                            "offload task exceeded timeout threshold"
                        );
                    } else {
                        debug!(?key, "offload task finished");
                    }
                    inner.tasks.remove(&key);
                    metrics::record_offload_completed(key.kind(), elapsed);
                }
                .instrument(span),
            ),
        }
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::new(TimeoutPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_wait_all_includes_tasks_spawned_while_waiting() {
        let manager = OffloadManager::default();
        let done = Arc::new(AtomicUsize::new(0));

        let nested = manager.clone();
        let counter = done.clone();
        manager.spawn("outer", async move {
            let counter = counter.clone();
            nested.spawn("inner", async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(manager.total_task_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_kind_ignores_other_kinds() {
        let manager = OffloadManager::default();
        manager.spawn("evict", tokio::time::sleep(Duration::from_secs(3600)));
        let fetch = manager.spawn("fetch", tokio::time::sleep(Duration::from_millis(10)));

        manager.wait_kind("fetch").await;
        assert!(!manager.is_in_flight(&fetch));
        assert_eq!(manager.active_task_count(), 1);
        manager.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_policy_drops_slow_task() {
        let manager = OffloadManager::new(TimeoutPolicy::Cancel(Duration::from_millis(50)));
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        manager.spawn("fetch", async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.wait_all().await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_policy_overrides_manager_policy() {
        let manager = OffloadManager::new(TimeoutPolicy::Cancel(Duration::from_millis(50)));
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        manager.spawn_with_policy("evict", TimeoutPolicy::None, async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.wait_all().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_by_key() {
        let manager = OffloadManager::default();
        let key = manager.spawn("evict", tokio::time::sleep(Duration::from_secs(60)));
        assert!(manager.is_in_flight(&key));
        assert!(manager.cancel(&key));
        manager.wait_all().await;
        assert!(!manager.cancel(&key));
        assert_eq!(key.kind(), "evict");
    }
}
