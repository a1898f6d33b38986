#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # valdora
//!
//! Data-access layer of the Valdora back-office dashboard.
//!
//! Views reach tenants, orders, AI store drafts, users, roles, permissions and
//! analytics only through [`AppState`]:
//!
//! - [`AppState::query`] subscribes to a cached [`Endpoint`] and observes it
//!   through a [`Subscription`](cache::Subscription).
//! - [`AppState::mutate`] runs a write and refetches every cached query
//!   whose tags it invalidates.
//! - [`AppState::mutate_optimistic`] also patches matching queries right
//!   away and restores them exactly if the write fails.
//!
//! Requests go through [`BaseQuery`], which talks to the in-memory
//! [`MockDataProvider`](valdora_mock::MockDataProvider) when mocks are enabled
//! and to the HTTP API through
//! [`ReqwestTransport`](valdora_reqwest::ReqwestTransport) otherwise. Both
//! paths produce the same `{data}` / `{error: {status, message}}` envelope.
//!
//! ```
//! use std::time::Duration;
//! use serde_json::json;
//! use valdora::{AppState, Endpoint};
//! use valdora::cache::{OptimisticUpdate, Patch};
//! use valdora_config::FeatureConfiguration;
//! use valdora_core::{ListParams, Resource, ResourceTag, Tag};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let state = AppState::new(
//!     FeatureConfiguration::builder()
//!         .mocks_enabled(true)
//!         .mock_delay(Duration::ZERO)
//!         .build(),
//! );
//!
//! let mut tenants = state.query(Endpoint::List(Resource::Tenant, ListParams::new()));
//! tenants.wait_settled().await;
//!
//! // An invalid update is rejected: the optimistic change is undone.
//! let before = tenants.current().data;
//! let invalid = json!({"email": "not-an-email"});
//! let result = state
//!     .mutate_optimistic(
//!         Endpoint::Update(Resource::Tenant, "1".into(), invalid.clone()),
//!         OptimisticUpdate::new([Tag::list(ResourceTag::Tenant)], Patch::merge("1", invalid)),
//!     )
//!     .await;
//! assert!(result.is_err());
//! assert_eq!(tenants.current().data, before);
//!
//! // A successful update refetches the list.
//! state
//!     .mutate(Endpoint::Update(Resource::Tenant, "1".into(), json!({"name": "Acme Inc"})))
//!     .await
//!     .unwrap();
//! let page = tenants.wait_settled().await.data.unwrap();
//! assert_eq!(page["items"][0]["name"], "Acme Inc");
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `metrics`: counters for fetches, attaches, mutations, rollbacks,
//!   invalidations, evictions and background tasks via the
//!   [`metrics`](https://docs.rs/metrics) facade.

/// Tag-aware query cache: entries, subscriptions, optimistic patches.
///
/// See [`QueryCache`](cache::QueryCache) for the entry lifecycle.
pub mod cache;

/// Endpoint catalogue.
pub mod endpoint;

/// Metrics declaration and recording.
///
/// When the `metrics` feature is enabled this module registers counters
/// for the cache and histograms for background tasks.
pub mod metrics;

/// Background task execution for refetches and deferred evictions.
pub mod offload;

/// Request router over the mock and the real transport.
pub mod router;

/// Explicitly owned application state.
pub mod state;

pub use cache::{QueryCache, QuerySnapshot, QueryStatus, Subscription};
pub use endpoint::Endpoint;
pub use router::BaseQuery;
pub use state::{AppState, AppStateBuilder};
pub use valdora_core::{ApiError, ApiResponse, ApiResult};

/// The `valdora` prelude.
///
/// ```rust
/// use valdora::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{MutationOptions, OptimisticUpdate, Patch};
    pub use crate::{ApiError, ApiResult, AppState, Endpoint, QueryStatus, Subscription};
}
