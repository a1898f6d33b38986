//! Metrics declaration and recording.
//!
//! With the `metrics` feature off every `record_*` function is an empty
//! inline function.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Query cache metrics

    /// Track number of executor runs started by the cache.
    pub static ref QUERY_FETCH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "valdora_query_fetch_total",
            "Total number of query executor runs."
        );
        "valdora_query_fetch_total"
    };
    /// Track number of subscriptions served from an existing entry.
    pub static ref QUERY_ATTACH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "valdora_query_attach_total",
            "Total number of subscriptions attached to an existing entry."
        );
        "valdora_query_attach_total"
    };
    /// Track number of mutations by outcome.
    pub static ref MUTATION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "valdora_mutation_total",
            "Total number of mutations, labelled by outcome."
        );
        "valdora_mutation_total"
    };
    /// Track number of entries restored after a failed optimistic mutation.
    pub static ref ROLLBACK_COUNTER: &'static str = {
        metrics::describe_counter!(
            "valdora_rollback_total",
            "Total number of cache entries rolled back."
        );
        "valdora_rollback_total"
    };
    /// Track number of entries invalidated by tag.
    pub static ref INVALIDATION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "valdora_invalidation_total",
            "Total number of cache entries invalidated."
        );
        "valdora_invalidation_total"
    };
    /// Track number of evicted entries.
    pub static ref EVICTION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "valdora_eviction_total",
            "Total number of cache entries evicted."
        );
        "valdora_eviction_total"
    };

    // Background tasks

    /// Track number of background tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "valdora_offload_tasks_spawned_total",
            "Total number of background tasks spawned."
        );
        "valdora_offload_tasks_spawned_total"
    };
    /// Track number of background tasks completed.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "valdora_offload_tasks_completed_total",
            "Total number of background tasks completed."
        );
        "valdora_offload_tasks_completed_total"
    };
    /// Track number of background tasks cancelled by their timeout.
    pub static ref OFFLOAD_TASKS_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "valdora_offload_tasks_timeout_total",
            "Total number of background tasks cancelled by timeout."
        );
        "valdora_offload_tasks_timeout_total"
    };
    /// Histogram of background task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "valdora_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of background tasks in seconds."
        );
        "valdora_offload_task_duration_seconds"
    };
}

/// Records an executor run.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fetch() {
    metrics::counter!(*QUERY_FETCH_COUNTER).increment(1);
}

/// Records a subscription served from an existing entry.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_attach() {
    metrics::counter!(*QUERY_ATTACH_COUNTER).increment(1);
}

/// Records a finished mutation; `outcome` is `success` or `failure`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_mutation(outcome: &'static str) {
    metrics::counter!(*MUTATION_COUNTER, "outcome" => outcome).increment(1);
}

/// Records restored entries.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_rollback(entries: usize) {
    metrics::counter!(*ROLLBACK_COUNTER).increment(entries as u64);
}

/// Records invalidated entries.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_invalidation(entries: usize) {
    metrics::counter!(*INVALIDATION_COUNTER).increment(entries as u64);
}

/// Records one evicted entry.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_eviction() {
    metrics::counter!(*EVICTION_COUNTER).increment(1);
}

/// Records a spawned background task.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_spawned(kind: &str) {
    metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => kind.to_string()).increment(1);
}

/// Records a completed background task.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_completed(kind: &str, duration: Duration) {
    metrics::counter!(*OFFLOAD_TASKS_COMPLETED, "kind" => kind.to_string()).increment(1);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_string())
        .record(duration.as_secs_f64());
}

/// Records a background task cancelled by its timeout.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_timeout(kind: &str, duration: Duration) {
    metrics::counter!(*OFFLOAD_TASKS_TIMEOUT, "kind" => kind.to_string()).increment(1);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_string())
        .record(duration.as_secs_f64());
}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fetch() {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_attach() {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_mutation(_outcome: &'static str) {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_rollback(_entries: usize) {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_invalidation(_entries: usize) {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_eviction() {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_spawned(_kind: &str) {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_completed(_kind: &str, _duration: Duration) {}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_timeout(_kind: &str, _duration: Duration) {}
