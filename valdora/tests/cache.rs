//! Behaviour of the query cache with hand-written executors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use valdora::cache::{MutationOptions, OptimisticUpdate, Patch, QueryCache, QueryStatus};
use valdora::offload::TimeoutPolicy;
use valdora_core::{ApiError, ApiResult, QueryKey, ResourceTag, Tag, TagSet};

type Executor = Box<dyn Fn() -> BoxFuture<'static, ApiResult<Value>> + Send + Sync>;

fn key(endpoint: &str) -> QueryKey {
    QueryKey::new(endpoint, vec![])
}

fn tenants_page() -> Value {
    json!({
        "items": [
            {"id": "1", "name": "Acme Corporation", "status": "active"},
            {"id": "2", "name": "TechStart Solutions", "status": "active"},
        ],
        "total": 2,
        "page": 1,
        "limit": 10,
    })
}

/// Returns `data` and counts calls.
fn counting(calls: &Arc<AtomicUsize>, data: Value) -> Executor {
    let calls = calls.clone();
    Box::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        let data = data.clone();
        async move { Ok(data) }.boxed()
    })
}

/// Like [`counting`], but every call waits for a permit of `gate`.
fn gated(calls: &Arc<AtomicUsize>, gate: &Arc<Semaphore>, data: Value) -> Executor {
    let calls = calls.clone();
    let gate = gate.clone();
    Box::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        let gate = gate.clone();
        let data = data.clone();
        async move {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
            Ok(data)
        }
        .boxed()
    })
}

#[tokio::test]
async fn test_query_goes_from_loading_to_success() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut sub = cache.query(key("/tenants"), TagSet::new(), counting(&calls, tenants_page()));
    assert_eq!(sub.current().status, QueryStatus::Loading);
    assert_eq!(sub.current().data, None);

    let snapshot = sub.wait_settled().await;
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(snapshot.data, Some(tenants_page()));
    assert_eq!(snapshot.error, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subscribers_attach_to_loading_and_success_entries() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("/orders");

    let mut first = cache.query(k.clone(), TagSet::new(), counting(&calls, json!([])));
    let mut second = cache.query(k.clone(), TagSet::new(), counting(&calls, json!([])));
    first.wait_settled().await;
    second.wait_settled().await;
    let third = cache.query(k.clone(), TagSet::new(), counting(&calls, json!([])));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.subscriber_count(&k), 3);
    assert_eq!(third.current().status, QueryStatus::Success);
}

#[tokio::test]
async fn test_failure_reaches_every_subscriber() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let failing = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<Value, _>(ApiError::Network("connection refused".into())) }
    };

    let k = key("/analytics");
    let mut a = cache.query(k.clone(), TagSet::new(), failing.clone());
    let mut b = cache.query(k.clone(), TagSet::new(), failing.clone());

    let seen_a = a.wait_settled().await;
    let seen_b = b.wait_settled().await;
    assert_eq!(seen_a.status, QueryStatus::Error);
    assert_eq!(seen_a, seen_b);
    assert_eq!(
        seen_a.error,
        Some(ApiError::Network("connection refused".into()))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A new subscriber to an errored entry retries.
    let mut c = cache.query(k.clone(), TagSet::new(), failing);
    assert_eq!(c.current().status, QueryStatus::Loading);
    c.wait_settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refetch_keeps_previous_data_while_loading() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(1));
    let tag = Tag::list(ResourceTag::Tenant);

    let mut sub = cache.query(
        key("/tenants"),
        TagSet::from([tag.clone()]),
        gated(&calls, &gate, tenants_page()),
    );
    sub.wait_settled().await;

    assert_eq!(cache.invalidate([&tag]), 1);
    let loading = sub.current();
    assert_eq!(loading.status, QueryStatus::Loading);
    assert_eq!(loading.data, Some(tenants_page()));

    gate.add_permits(1);
    assert_eq!(sub.wait_settled().await.status, QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_optimistic_mutation_restores_exact_data() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let list = Tag::list(ResourceTag::Tenant);
    let entity = Tag::entity(ResourceTag::Tenant, "2");

    let mut page = cache.query(
        key("/tenants"),
        TagSet::from([list.clone()]),
        counting(&calls, tenants_page()),
    );
    let mut single = cache.query(
        key("/tenants/2"),
        TagSet::from([entity.clone()]),
        counting(&calls, json!({"id": "2", "name": "TechStart Solutions", "status": "active"})),
    );
    let before_page = page.wait_settled().await;
    let before_single = single.wait_settled().await;

    let gate = Arc::new(Semaphore::new(0));
    let executor_gate = gate.clone();
    let mutation = cache.mutate(
        move || async move {
            let _ = executor_gate.acquire().await;
            Err::<Value, _>(ApiError::Http {
                status: 500,
                message: "database unavailable".into(),
            })
        },
        MutationOptions::new()
            .optimistic(OptimisticUpdate::new(
                [list.clone(), entity.clone()],
                Patch::merge("2", json!({"status": "suspended", "note": "pending"})),
            ))
            .invalidates([list.clone(), entity.clone()]),
    );
    tokio::pin!(mutation);

    // Drive the mutation until it waits on its executor.
    tokio::select! {
        biased;
        _ = &mut mutation => panic!("executor should be blocked"),
        _ = tokio::task::yield_now() => {}
    }
    let optimistic = page.current().data.unwrap_or_default();
    assert_eq!(optimistic["items"][1]["status"], "suspended");
    assert_eq!(optimistic["items"][1]["note"], "pending");
    assert_eq!(single.current().data.unwrap_or_default()["status"], "suspended");

    gate.add_permits(1);
    let result = mutation.await;
    assert_eq!(
        result,
        Err(ApiError::Http {
            status: 500,
            message: "database unavailable".into(),
        })
    );

    assert_eq!(page.current(), before_page);
    assert_eq!(single.current(), before_single);
    // No refetch after a failed mutation.
    cache.settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_optimistic_state_is_published_to_subscribers() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let list = Tag::list(ResourceTag::Order);
    let mut sub = cache.query(
        key("/orders"),
        TagSet::from([list.clone()]),
        counting(&calls, json!({"items": [], "total": 0, "page": 1, "limit": 10})),
    );
    sub.wait_settled().await;

    let result = cache
        .mutate(
            || async { Ok(json!({"id": "6"})) },
            MutationOptions::new().optimistic(OptimisticUpdate::new(
                [list.clone()],
                Patch::InsertItem(json!({"id": "6", "orderNumber": "ORD-1006"})),
            )),
        )
        .await;
    assert_eq!(result, Ok(json!({"id": "6"})));

    let snapshot = sub.changed().await;
    let data = snapshot.data.unwrap_or_default();
    assert_eq!(data["total"], 1);
    assert_eq!(data["items"][0]["orderNumber"], "ORD-1006");
    // Nothing was invalidated, so the optimistic data stays.
    assert_eq!(snapshot.status, QueryStatus::Success);
}

#[tokio::test]
async fn test_invalidation_refetches_each_tagged_entry_exactly_once() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let list_calls = Arc::new(AtomicUsize::new(0));
    let entity_calls = Arc::new(AtomicUsize::new(0));
    let other_calls = Arc::new(AtomicUsize::new(0));
    let list = Tag::list(ResourceTag::User);
    let entity = Tag::entity(ResourceTag::User, "1");

    let mut subs = vec![
        cache.query(
            key("/users"),
            TagSet::from([list.clone()]),
            counting(&list_calls, json!({"items": [], "total": 0})),
        ),
        cache.query(
            key("/users/1"),
            TagSet::from([entity.clone()]),
            counting(&entity_calls, json!({"id": "1"})),
        ),
        cache.query(
            key("/roles"),
            TagSet::from([Tag::list(ResourceTag::Role)]),
            counting(&other_calls, json!({"items": [], "total": 0})),
        ),
    ];
    for sub in &mut subs {
        sub.wait_settled().await;
    }

    cache
        .mutate(
            || async { Ok(json!({"id": "1", "name": "Renamed"})) },
            MutationOptions::new().invalidates([entity.clone(), list.clone()]),
        )
        .await
        .unwrap();

    assert_eq!(subs[0].current().status, QueryStatus::Loading);
    assert_eq!(subs[1].current().status, QueryStatus::Loading);
    assert_eq!(subs[2].current().status, QueryStatus::Success);

    cache.settle().await;
    assert_eq!(list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(entity_calls.load(Ordering::SeqCst), 2);
    assert_eq!(other_calls.load(Ordering::SeqCst), 1);
    for sub in &subs {
        assert_eq!(sub.current().status, QueryStatus::Success);
    }
}

#[tokio::test]
async fn test_kind_tag_invalidates_every_entry_of_the_kind() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut a = cache.query(
        key("/permissions"),
        TagSet::from([Tag::list(ResourceTag::Permission)]),
        counting(&calls, json!([])),
    );
    let mut b = cache.query(
        key("/permissions/3"),
        TagSet::from([Tag::entity(ResourceTag::Permission, "3")]),
        counting(&calls, json!({})),
    );
    a.wait_settled().await;
    b.wait_settled().await;

    assert_eq!(cache.invalidate([&Tag::kind(ResourceTag::Permission)]), 2);
    cache.settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_zero_retention_evicts_on_last_unsubscribe() {
    let cache = QueryCache::new(Duration::ZERO);
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("/roles");

    let mut a = cache.query(k.clone(), TagSet::new(), counting(&calls, json!([])));
    let b = cache.query(k.clone(), TagSet::new(), counting(&calls, json!([])));
    a.wait_settled().await;

    drop(b);
    assert!(cache.contains(&k));
    a.unsubscribe();
    assert!(!cache.contains(&k));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let cache = QueryCache::new(Duration::ZERO);
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("/roles/1");

    let mut keep = cache.query(k.clone(), TagSet::new(), counting(&calls, json!({})));
    let leave = cache.query(k.clone(), TagSet::new(), counting(&calls, json!({})));
    keep.wait_settled().await;

    cache.unsubscribe(&k, leave.id());
    cache.unsubscribe(&k, leave.id());
    drop(leave);
    assert_eq!(cache.subscriber_count(&k), 1);
    assert!(cache.contains(&k));
}

#[tokio::test(start_paused = true)]
async fn test_retention_defers_eviction_and_resubscribe_cancels_it() {
    let retention = Duration::from_secs(60);
    let cache = QueryCache::new(retention);
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("/tenants");

    let mut sub = cache.query(k.clone(), TagSet::new(), counting(&calls, tenants_page()));
    sub.wait_settled().await;
    drop(sub);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(cache.contains(&k));

    // Back within the retention window: served from cache, eviction cancelled.
    let again = cache.query(k.clone(), TagSet::new(), counting(&calls, tenants_page()));
    assert_eq!(again.current().status, QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(cache.contains(&k));

    drop(again);
    tokio::time::sleep(retention + Duration::from_secs(1)).await;
    assert!(!cache.contains(&k));
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribing_while_loading_still_caches_result() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("/ai-store-drafts");
    let slow = {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(json!({"items": [], "total": 0}))
            }
        }
    };

    let sub = cache.query(k.clone(), TagSet::new(), slow.clone());
    drop(sub);
    assert_eq!(
        cache.snapshot(&k).map(|s| s.status),
        Some(QueryStatus::Loading)
    );

    cache.settle().await;
    assert_eq!(
        cache.snapshot(&k).map(|s| s.status),
        Some(QueryStatus::Success)
    );
    let late = cache.query(k.clone(), TagSet::new(), slow);
    assert_eq!(late.current().status, QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_retention_never_evicts_a_loading_entry() {
    let cache = QueryCache::new(Duration::ZERO);
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let k = key("/orders/1");

    let sub = cache.query(k.clone(), TagSet::new(), gated(&calls, &gate, json!({"id": "1"})));
    drop(sub);
    assert!(cache.contains(&k));

    gate.add_permits(1);
    cache.settle().await;
    assert!(!cache.contains(&k));
}

#[tokio::test(start_paused = true)]
async fn test_last_resolution_wins() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let tag = Tag::list(ResourceTag::Analytics);
    let executor = {
        let calls = calls.clone();
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            // The first refetch is slower than the second.
            let delay = match call {
                1 => Duration::from_millis(300),
                2 => Duration::from_millis(10),
                _ => Duration::ZERO,
            };
            async move {
                tokio::time::sleep(delay).await;
                Ok(json!({ "run": call }))
            }
        }
    };

    let mut sub = cache.query(key("/analytics"), TagSet::from([tag.clone()]), executor);
    sub.wait_settled().await;

    cache.invalidate([&tag]);
    cache.invalidate([&tag]);
    cache.settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sub.current().data, Some(json!({"run": 1})));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_timeout_does_not_cancel_eviction() {
    let cache = QueryCache::builder()
        .retention(Duration::from_secs(60))
        .timeout_policy(TimeoutPolicy::Cancel(Duration::from_secs(5)))
        .build();
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("/tenants");

    let mut sub = cache.query(k.clone(), TagSet::new(), counting(&calls, tenants_page()));
    sub.wait_settled().await;
    sub.unsubscribe();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(cache.contains(&k));
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert!(!cache.contains(&k));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_fetch_without_subscribers_is_evicted() {
    let cache = QueryCache::builder()
        .retention(Duration::from_secs(60))
        .timeout_policy(TimeoutPolicy::Cancel(Duration::from_secs(5)))
        .build();
    let k = key("/analytics");

    let sub = cache.query(k.clone(), TagSet::new(), || async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(json!({}))
    });
    drop(sub);

    tokio::time::sleep(Duration::from_secs(6)).await;
    let snapshot = cache.snapshot(&k).unwrap();
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.error, Some(ApiError::Timeout(Duration::from_secs(5))));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!cache.contains(&k));
}

/// Fails with a server error after `delay`.
fn failing_after(delay: Duration) -> impl FnOnce() -> BoxFuture<'static, ApiResult<Value>> {
    move || {
        async move {
            tokio::time::sleep(delay).await;
            Err(ApiError::Http {
                status: 500,
                message: "database unavailable".into(),
            })
        }
        .boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_failed_mutations_each_undo_their_own_patch() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let list = Tag::list(ResourceTag::Tenant);

    let mut page = cache.query(
        key("/tenants"),
        TagSet::from([list.clone()]),
        counting(&calls, tenants_page()),
    );
    let before = page.wait_settled().await;

    let suspend = |id: &str| {
        MutationOptions::new().optimistic(OptimisticUpdate::new(
            [list.clone()],
            Patch::merge(id, json!({"status": "suspended"})),
        ))
    };
    let (first, second) = tokio::join!(
        cache.mutate(failing_after(Duration::from_millis(100)), suspend("1")),
        cache.mutate(failing_after(Duration::from_millis(200)), suspend("2")),
    );

    assert!(first.is_err());
    assert!(second.is_err());
    assert_eq!(page.current(), before);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_mutation_keeps_overlapping_successful_patch() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    let list = Tag::list(ResourceTag::Tenant);

    let mut page = cache.query(
        key("/tenants"),
        TagSet::from([list.clone()]),
        counting(&calls, tenants_page()),
    );
    page.wait_settled().await;

    let failed = cache.mutate(
        failing_after(Duration::from_millis(100)),
        MutationOptions::new().optimistic(OptimisticUpdate::new(
            [list.clone()],
            Patch::merge("1", json!({"status": "suspended"})),
        )),
    );
    let pending = cache.mutate(
        || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Value::Null)
        },
        MutationOptions::new().optimistic(OptimisticUpdate::new(
            [list.clone()],
            Patch::remove("2"),
        )),
    );
    tokio::pin!(pending);

    // The first mutation fails while the second is still in flight.
    tokio::select! {
        result = failed => assert!(result.is_err()),
        _ = &mut pending => panic!("second mutation should still be pending"),
    }
    let data = page.current().data.unwrap();
    assert_eq!(data["total"], 1);
    assert_eq!(data["items"][0]["id"], "1");
    assert_eq!(data["items"][0]["status"], "active");

    pending.await.unwrap();
}
