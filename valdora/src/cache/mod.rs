//! Tag-aware query cache with optimistic mutations.
//!
//! Each cached query is an entry keyed by [`QueryKey`]. An entry remembers the
//! tags it provides, its subscribers and the executor that produced it, and
//! publishes a [`QuerySnapshot`] through a `tokio::sync::watch` channel.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──query──▶ Loading ──┬──▶ Success ──invalidate──▶ Loading ...
//!                                    └──▶ Error   ──query───────▶ Loading ...
//! ```
//!
//! - `query` on a `Success` or `Loading` entry attaches to it; on an absent or
//!   `Error` entry it (re)starts the executor in the background. Data of the
//!   previous run stays visible while loading.
//! - `mutate` optionally patches matching entries right away, runs its
//!   executor, then either refetches every entry providing an invalidated tag
//!   or restores the patched entries to their pre-mutation data.
//! - When the last subscriber leaves, the entry is evicted after the
//!   retention period unless someone subscribes again. An entry is never
//!   evicted while it has subscribers or while its executor is in flight.
//!
//! # Ordering
//!
//! Results are applied in the order executors resolve: the last resolution
//! wins. In-flight executors are never cancelled by the cache.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use serde_json::json;
//! use valdora::cache::{MutationOptions, QueryCache, QueryStatus};
//! use valdora_core::{QueryKey, ResourceTag, Tag, TagSet};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = QueryCache::new(Duration::from_secs(60));
//! let key = QueryKey::new("/tenants", vec![]);
//! let mut tenants = cache.query(
//!     key.clone(),
//!     TagSet::from([Tag::list(ResourceTag::Tenant)]),
//!     || async { Ok(json!({"items": [], "total": 0, "page": 1, "limit": 10})) },
//! );
//! assert_eq!(tenants.wait_settled().await.status, QueryStatus::Success);
//!
//! cache
//!     .mutate(
//!         || async { Ok(json!({"id": "5"})) },
//!         MutationOptions::new().invalidates([Tag::list(ResourceTag::Tenant)]),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(tenants.current().status, QueryStatus::Loading);
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};
use valdora_config::DEFAULT_CACHE_RETENTION;
use valdora_core::{ApiError, ApiResult, QueryKey, Tag, TagSet};

use crate::metrics;
use crate::offload::{OffloadManager, TimeoutPolicy};

mod mutation;
mod patch;
mod snapshot;
mod subscription;

pub use mutation::{MutationOptions, OptimisticUpdate};
pub use patch::{Patch, PatchPair};
pub use snapshot::{QuerySnapshot, QueryStatus};
pub use subscription::{SubscriberId, Subscription};

/// Kind of the background tasks running executors.
const FETCH_TASK: &str = "fetch";
/// Kind of the background tasks evicting entries.
const EVICT_TASK: &str = "evict";

/// Type-erased query executor, re-run on every refetch.
pub type QueryExecutor = Arc<dyn Fn() -> BoxFuture<'static, ApiResult<Value>> + Send + Sync>;

struct Entry {
    tags: TagSet,
    subscribers: BTreeSet<SubscriberId>,
    executor: QueryExecutor,
    state: watch::Sender<QuerySnapshot>,
    /// Bumped on every attach and release; a pending eviction only proceeds
    /// if the epoch it was scheduled with is still current.
    epoch: u64,
}

impl Entry {
    fn new(tags: TagSet, executor: QueryExecutor) -> Self {
        let (state, _) = watch::channel(QuerySnapshot::default());
        Self {
            tags,
            subscribers: BTreeSet::new(),
            executor,
            state,
            epoch: 0,
        }
    }

    fn is_idle(&self) -> bool {
        self.subscribers.is_empty() && !self.state.borrow().is_loading()
    }
}

pub(crate) struct Inner {
    entries: DashMap<QueryKey, Entry>,
    offload: OffloadManager,
    retention: Duration,
    next_subscriber: AtomicU64,
}

impl Inner {
    fn spawn_fetch(self: &Arc<Self>, key: QueryKey, executor: QueryExecutor) {
        debug!(%key, "fetching query");
        metrics::record_fetch();
        let cancelled = match self.offload.timeout_policy() {
            TimeoutPolicy::Cancel(timeout) => ApiError::Timeout(timeout),
            _ => ApiError::Network("query fetch was cancelled".into()),
        };
        let cache = Arc::downgrade(self);
        self.offload.spawn(FETCH_TASK, async move {
            let mut guard = FetchGuard {
                cache: cache.clone(),
                key: key.clone(),
                cancelled: Some(cancelled),
            };
            let result = executor().await;
            guard.disarm();
            if let Some(cache) = cache.upgrade() {
                cache.resolve(&key, result);
            }
        });
    }

    /// Publishes an executor result. Returns the epoch to evict with when
    /// nobody is subscribed anymore.
    fn store(&self, key: &QueryKey, result: ApiResult<Value>) -> Option<u64> {
        let Some(entry) = self.entries.get(key) else {
            debug!(%key, "query resolved after its entry was evicted");
            return None;
        };
        if let Err(error) = &result {
            debug!(%key, %error, "query failed");
        } else {
            debug!(%key, "query succeeded");
        }
        entry.state.send_modify(|snapshot| snapshot.resolve(result));
        entry.subscribers.is_empty().then_some(entry.epoch)
    }

    fn resolve(self: &Arc<Self>, key: &QueryKey, result: ApiResult<Value>) {
        if let Some(epoch) = self.store(key, result) {
            self.schedule_eviction(key.clone(), epoch);
        }
    }

    fn release(self: &Arc<Self>, key: &QueryKey, id: SubscriberId) {
        let epoch = {
            let Some(mut entry) = self.entries.get_mut(key) else {
                return;
            };
            if !entry.subscribers.remove(&id) {
                return;
            }
            entry.epoch += 1;
            debug!(%key, subscriber = %id, remaining = entry.subscribers.len(), "unsubscribed");
            if !entry.is_idle() {
                return;
            }
            entry.epoch
        };
        self.schedule_eviction(key.clone(), epoch);
    }

    fn schedule_eviction(self: &Arc<Self>, key: QueryKey, epoch: u64) {
        if self.retention.is_zero() {
            self.evict(&key, epoch);
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!(%key, "no runtime to schedule eviction on");
            return;
        }
        let cache = Arc::downgrade(self);
        let retention = self.retention;
        self.offload
            .spawn_with_policy(EVICT_TASK, TimeoutPolicy::None, async move {
                tokio::time::sleep(retention).await;
                if let Some(cache) = cache.upgrade() {
                    cache.evict(&key, epoch);
                }
            });
    }

    fn evict(&self, key: &QueryKey, epoch: u64) -> bool {
        let evicted = self
            .entries
            .remove_if(key, |_, entry| entry.epoch == epoch && entry.is_idle())
            .is_some();
        if evicted {
            debug!(%key, "evicted query");
            metrics::record_eviction();
        }
        evicted
    }

    fn apply_optimistic(&self, update: &OptimisticUpdate) -> Vec<(QueryKey, PatchPair)> {
        let mut applied = Vec::new();
        for entry in self.entries.iter() {
            if !entry.tags.intersects(&update.targets) {
                continue;
            }
            let mut prepared = None;
            entry.state.send_if_modified(|snapshot| {
                let Some(data) = snapshot.data.as_mut() else {
                    return false;
                };
                let pair = PatchPair::prepare(update.patch.clone(), data);
                let changed = pair.forward.apply(data);
                if changed {
                    prepared = Some(pair);
                }
                changed
            });
            if let Some(pair) = prepared {
                applied.push((entry.key().clone(), pair));
            }
        }
        debug!(entries = applied.len(), "optimistic update applied");
        applied
    }

    fn rollback(&self, applied: Vec<(QueryKey, PatchPair)>) {
        let count = applied.len();
        for (key, pair) in applied {
            let Some(entry) = self.entries.get(&key) else {
                debug!(%key, "rolled back entry was evicted");
                continue;
            };
            entry.state.send_if_modified(|snapshot| match snapshot.data.as_mut() {
                Some(data) => pair.inverse.apply(data),
                None => false,
            });
        }
        metrics::record_rollback(count);
    }
}

/// Marks the entry as failed if the fetch future is dropped before the
/// executor resolves (timeout policy, `cancel_all`, runtime shutdown).
struct FetchGuard {
    cache: Weak<Inner>,
    key: QueryKey,
    cancelled: Option<ApiError>,
}

impl FetchGuard {
    fn disarm(&mut self) {
        self.cancelled = None;
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if let Some(error) = self.cancelled.take()
            && let Some(cache) = self.cache.upgrade()
        {
            warn!(key = %self.key, %error, "query fetch dropped before resolving");
            cache.resolve(&self.key, Err(error));
        }
    }
}

/// The query cache.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    /// Cache evicting unsubscribed entries after `retention`.
    pub fn new(retention: Duration) -> Self {
        Self::builder().retention(retention).build()
    }

    /// Starts a builder.
    pub fn builder() -> QueryCacheBuilder {
        QueryCacheBuilder::default()
    }

    /// Subscribes to the query `key`.
    ///
    /// Attaches to a `Success` or `Loading` entry. Otherwise marks the entry
    /// `Loading` and runs `executor` in the background; its result, data or
    /// error, is published to every subscriber. Must be called from within a
    /// tokio runtime.
    pub fn query<F, Fut>(&self, key: QueryKey, tags: TagSet, executor: F) -> Subscription
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        let executor: QueryExecutor = Arc::new(move || executor().boxed());
        let id = SubscriberId(self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed));

        let (receiver, fetch) = {
            let mut entry = self
                .inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(tags.clone(), executor.clone()));
            entry.subscribers.insert(id);
            entry.epoch += 1;

            let status = entry.state.borrow().status;
            let fetch = match status {
                QueryStatus::Success | QueryStatus::Loading => {
                    debug!(%key, subscriber = %id, status = status.as_str(), "attached to query");
                    metrics::record_attach();
                    None
                }
                QueryStatus::Uninitialized | QueryStatus::Error => {
                    entry.tags = tags;
                    entry.executor = executor.clone();
                    entry.state.send_modify(QuerySnapshot::begin_loading);
                    Some(executor)
                }
            };
            (entry.state.subscribe(), fetch)
        };

        if let Some(executor) = fetch {
            self.inner.spawn_fetch(key.clone(), executor);
        }
        Subscription::new(id, key, receiver, Arc::downgrade(&self.inner))
    }

    /// Removes a subscriber. Unknown keys and ids are ignored.
    pub fn unsubscribe(&self, key: &QueryKey, id: SubscriberId) {
        self.inner.release(key, id);
    }

    /// Runs a mutation.
    ///
    /// 1. The optimistic patch, if any, is applied to the data of every entry
    ///    providing one of its targets, remembering how to undo it.
    /// 2. `executor` runs on the caller's task.
    /// 3. On success every entry providing an invalidated tag goes to
    ///    `Loading` and is refetched once.
    /// 4. On failure every patched entry gets its pre-mutation data back and
    ///    the error is returned.
    pub async fn mutate<F, Fut>(&self, executor: F, options: MutationOptions) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>>,
    {
        let MutationOptions {
            optimistic,
            invalidates,
        } = options;
        let applied = optimistic
            .map(|update| self.inner.apply_optimistic(&update))
            .unwrap_or_default();

        match executor().await {
            Ok(data) => {
                metrics::record_mutation("success");
                let refetched = self.invalidate(&invalidates);
                debug!(refetched, "mutation succeeded");
                Ok(data)
            }
            Err(error) => {
                metrics::record_mutation("failure");
                if !applied.is_empty() {
                    warn!(%error, entries = applied.len(), "mutation failed, rolling back");
                }
                self.inner.rollback(applied);
                Err(error)
            }
        }
    }

    /// Refetches every entry providing one of `tags`. Returns how many.
    pub fn invalidate<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> usize {
        let tags: Vec<&Tag> = tags.into_iter().collect();
        if tags.is_empty() {
            return 0;
        }
        let mut refetch = Vec::new();
        for entry in self.inner.entries.iter() {
            if entry.tags.intersects(tags.iter().copied()) {
                entry.state.send_modify(QuerySnapshot::begin_loading);
                refetch.push((entry.key().clone(), entry.executor.clone()));
            }
        }
        let count = refetch.len();
        for (key, executor) in refetch {
            self.inner.spawn_fetch(key, executor);
        }
        metrics::record_invalidation(count);
        count
    }

    /// Current state of an entry.
    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.inner
            .entries
            .get(key)
            .map(|entry| entry.state.borrow().clone())
    }

    /// Tags provided by an entry.
    pub fn tags(&self, key: &QueryKey) -> Option<TagSet> {
        self.inner.entries.get(key).map(|entry| entry.tags.clone())
    }

    /// Number of subscribers of an entry.
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner
            .entries
            .get(key)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether the cache holds no entry.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// How long an unsubscribed entry is kept.
    pub fn retention(&self) -> Duration {
        self.inner.retention
    }

    /// Background task manager running executors and evictions.
    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    /// Waits until no executor is in flight, including refetches started
    /// while waiting. Pending evictions are not awaited.
    pub async fn settle(&self) {
        self.inner.offload.wait_kind(FETCH_TASK).await;
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.entries.len())
            .field("retention", &self.inner.retention)
            .field("offload", &self.inner.offload)
            .finish()
    }
}

/// Builder for [`QueryCache`].
#[derive(Debug, Clone)]
pub struct QueryCacheBuilder {
    retention: Duration,
    timeout_policy: TimeoutPolicy,
}

impl Default for QueryCacheBuilder {
    fn default() -> Self {
        Self {
            retention: DEFAULT_CACHE_RETENTION,
            timeout_policy: TimeoutPolicy::None,
        }
    }
}

impl QueryCacheBuilder {
    /// Sets how long an unsubscribed entry is kept. Zero evicts immediately.
    pub fn retention(self, retention: Duration) -> Self {
        Self { retention, ..self }
    }

    /// Sets the policy applied to executor runs and evictions.
    ///
    /// An executor dropped by [`TimeoutPolicy::Cancel`] leaves its entry in
    /// `Error` with [`ApiError::Timeout`].
    pub fn timeout_policy(self, timeout_policy: TimeoutPolicy) -> Self {
        Self {
            timeout_policy,
            ..self
        }
    }

    /// Builds the cache.
    pub fn build(self) -> QueryCache {
        QueryCache {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                offload: OffloadManager::new(self.timeout_policy),
                retention: self.retention,
                next_subscriber: AtomicU64::new(0),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use valdora_core::ResourceTag;

    fn key(endpoint: &str) -> QueryKey {
        QueryKey::new(endpoint, vec![])
    }

    #[tokio::test]
    async fn test_subscription_ids_are_unique() {
        let cache = QueryCache::new(Duration::ZERO);
        let a = cache.query(key("/a"), TagSet::new(), || async { Ok(json!(1)) });
        let b = cache.query(key("/a"), TagSet::new(), || async { Ok(json!(1)) });
        assert_ne!(a.id(), b.id());
        assert_eq!(cache.subscriber_count(&key("/a")), 2);
    }

    #[tokio::test]
    async fn test_entry_keeps_tags_of_first_fetch() {
        let cache = QueryCache::new(Duration::ZERO);
        let tags = TagSet::from([Tag::list(ResourceTag::Order)]);
        let mut first = cache.query(key("/orders"), tags.clone(), || async { Ok(json!([])) });
        first.wait_settled().await;
        let _second = cache.query(key("/orders"), TagSet::new(), || async { Ok(json!([])) });
        assert_eq!(cache.tags(&key("/orders")), Some(tags));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fetch_is_reported_as_timeout() {
        let cache = QueryCache::builder()
            .retention(Duration::ZERO)
            .timeout_policy(TimeoutPolicy::Cancel(Duration::from_millis(100)))
            .build();
        let mut sub = cache.query(key("/slow"), TagSet::new(), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!("late"))
        });

        let snapshot = sub.wait_settled().await;
        assert_eq!(snapshot.status, QueryStatus::Error);
        assert_eq!(
            snapshot.error,
            Some(ApiError::Timeout(Duration::from_millis(100)))
        );
    }

    #[tokio::test]
    async fn test_invalidate_without_tags_is_noop() {
        let cache = QueryCache::default();
        let mut sub = cache.query(key("/x"), TagSet::new(), || async { Ok(json!(1)) });
        sub.wait_settled().await;
        assert_eq!(cache.invalidate(std::iter::empty()), 0);
        assert_eq!(cache.snapshot(&key("/x")).map(|s| s.status), Some(QueryStatus::Success));
    }
}
