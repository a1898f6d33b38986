//! Subscriber handle returned by `query`.

use std::fmt;
use std::sync::Weak;

use tokio::sync::watch;
use valdora_core::QueryKey;

use super::Inner;
use super::snapshot::QuerySnapshot;

/// Identifies one subscriber of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live view of one cache entry.
///
/// Every state change of the entry is observable through [`changed`] and
/// [`wait_settled`]. Dropping the subscription unsubscribes; calling
/// [`unsubscribe`] does so explicitly. Both are idempotent.
///
/// [`changed`]: Subscription::changed
/// [`wait_settled`]: Subscription::wait_settled
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    id: SubscriberId,
    key: QueryKey,
    receiver: watch::Receiver<QuerySnapshot>,
    cache: Weak<Inner>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        key: QueryKey,
        receiver: watch::Receiver<QuerySnapshot>,
        cache: Weak<Inner>,
    ) -> Self {
        Self {
            id,
            key,
            receiver,
            cache,
            active: true,
        }
    }

    /// Subscriber id, for [`QueryCache::unsubscribe`](super::QueryCache::unsubscribe).
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Key of the entry.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state of the entry.
    pub fn current(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next state change and returns the new state.
    ///
    /// If the entry is gone, returns the last state seen.
    pub async fn changed(&mut self) -> QuerySnapshot {
        let _ = self.receiver.changed().await;
        self.receiver.borrow_and_update().clone()
    }

    /// Waits until the entry is `Success` or `Error` and returns that state.
    pub async fn wait_settled(&mut self) -> QuerySnapshot {
        if let Ok(snapshot) = self.receiver.wait_for(QuerySnapshot::is_settled).await {
            return snapshot.clone();
        }
        self.receiver.borrow().clone()
    }

    /// Stops observing the entry.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(cache) = self.cache.upgrade() {
            cache.release(&self.key, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("status", &self.receiver.borrow().status)
            .field("active", &self.active)
            .finish()
    }
}
