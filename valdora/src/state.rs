//! Application state: the single owner of configuration, router and cache.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use valdora_config::FeatureConfiguration;
use valdora_core::{ApiError, ApiResult, QueryKey, Transport};
use valdora_reqwest::{NoToken, TokenProvider};

use crate::cache::{MutationOptions, OptimisticUpdate, QueryCache, SubscriberId, Subscription};
use crate::endpoint::Endpoint;
use crate::offload::TimeoutPolicy;
use crate::router::BaseQuery;

/// Everything the views need to reach data, built once at startup and
/// passed around explicitly.
///
/// Views only call [`query`](AppState::query),
/// [`mutate`](AppState::mutate), [`mutate_optimistic`](AppState::mutate_optimistic)
/// and [`unsubscribe`](AppState::unsubscribe). Endpoints behind a disabled
/// feature toggle fail with [`ApiError::FeatureDisabled`] without reaching
/// any transport.
///
/// ```
/// use std::time::Duration;
/// use valdora::{AppState, Endpoint};
/// use valdora::cache::QueryStatus;
/// use valdora_config::FeatureConfiguration;
/// use valdora_core::{ListParams, Resource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = FeatureConfiguration::builder()
///     .mocks_enabled(true)
///     .mock_delay(Duration::ZERO)
///     .build();
/// let state = AppState::new(config);
///
/// let mut tenants = state.query(Endpoint::List(Resource::Tenant, ListParams::new()));
/// let snapshot = tenants.wait_settled().await;
/// assert_eq!(snapshot.status, QueryStatus::Success);
/// assert_eq!(snapshot.data.unwrap()["total"], 4);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AppState {
    config: Arc<FeatureConfiguration>,
    router: BaseQuery,
    cache: QueryCache,
}

impl AppState {
    /// State for `config`, with no session token.
    pub fn new(config: FeatureConfiguration) -> Self {
        Self::builder(config).build()
    }

    /// State for the process-wide configuration resolved from the environment.
    pub fn from_env() -> Self {
        Self::new(FeatureConfiguration::current().clone())
    }

    /// Starts a builder.
    pub fn builder(config: FeatureConfiguration) -> AppStateBuilder {
        AppStateBuilder::new(config)
    }

    /// The configuration.
    pub fn config(&self) -> &FeatureConfiguration {
        &self.config
    }

    /// The router.
    pub fn router(&self) -> &BaseQuery {
        &self.router
    }

    /// The cache.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Subscribes to a query endpoint.
    ///
    /// Failures, including a disabled feature or a mutation endpoint passed
    /// by mistake, are delivered as the entry's `Error` state.
    pub fn query(&self, endpoint: Endpoint) -> Subscription {
        let key = endpoint.key();
        let tags = endpoint.provides();
        let rejection = self.reject(&endpoint).or_else(|| {
            (!endpoint.is_query()).then(|| {
                ApiError::Validation(format!("`{}` is not a query endpoint", endpoint.name()))
            })
        });

        if let Some(error) = rejection {
            debug!(%key, %error, "query rejected");
            return self.cache.query(key, tags, move || {
                let error = error.clone();
                async move { Err(error) }
            });
        }

        let router = self.router.clone();
        let request = endpoint.request();
        self.cache.query(key, tags, move || {
            let router = router.clone();
            let request = request.clone();
            async move { router.execute(request).await }
        })
    }

    /// Runs a mutation endpoint and refetches the queries it invalidates.
    pub async fn mutate(&self, endpoint: Endpoint) -> ApiResult<Value> {
        self.run_mutation(endpoint, None).await
    }

    /// Runs a mutation endpoint with an optimistic patch, rolled back if the
    /// call fails.
    pub async fn mutate_optimistic(
        &self,
        endpoint: Endpoint,
        update: OptimisticUpdate,
    ) -> ApiResult<Value> {
        self.run_mutation(endpoint, Some(update)).await
    }

    /// Removes a subscriber from a query.
    pub fn unsubscribe(&self, key: &QueryKey, id: SubscriberId) {
        self.cache.unsubscribe(key, id);
    }

    async fn run_mutation(
        &self,
        endpoint: Endpoint,
        update: Option<OptimisticUpdate>,
    ) -> ApiResult<Value> {
        if let Some(error) = self.reject(&endpoint) {
            return Err(error);
        }
        if endpoint.is_query() {
            return Err(ApiError::Validation(format!(
                "`{}` is not a mutation endpoint",
                endpoint.name()
            )));
        }

        let mut options = MutationOptions::new().invalidates(endpoint.invalidates());
        if let Some(update) = update {
            options = options.optimistic(update);
        }
        let request = endpoint.request();
        debug!(endpoint = endpoint.name(), path = %request.path(), "mutation");
        self.cache
            .mutate(|| self.router.execute(request), options)
            .await
    }

    fn reject(&self, endpoint: &Endpoint) -> Option<ApiError> {
        let feature = endpoint.feature()?;
        if self.config.features.is_enabled(feature) {
            None
        } else {
            Some(ApiError::FeatureDisabled(feature.into()))
        }
    }
}

/// Builder for [`AppState`].
pub struct AppStateBuilder {
    config: FeatureConfiguration,
    tokens: Box<dyn TokenProvider>,
    transport: Option<Box<dyn Transport>>,
    timeout_policy: TimeoutPolicy,
}

impl AppStateBuilder {
    fn new(config: FeatureConfiguration) -> Self {
        Self {
            config,
            tokens: Box::new(NoToken),
            transport: None,
            timeout_policy: TimeoutPolicy::None,
        }
    }

    /// Sets the session token source of the real API transport.
    pub fn token_provider<T>(mut self, tokens: T) -> Self
    where
        T: TokenProvider + 'static,
    {
        self.tokens = Box::new(tokens);
        self
    }

    /// Uses `transport` instead of the one `mocks_enabled` selects.
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Sets the policy applied to background fetches.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Builds the state.
    pub fn build(self) -> AppState {
        let router = match self.transport {
            Some(transport) => BaseQuery::new(transport),
            None => BaseQuery::from_config(&self.config, self.tokens),
        };
        let cache = QueryCache::builder()
            .retention(self.config.cache_retention)
            .timeout_policy(self.timeout_policy)
            .build();
        debug!(
            transport = router.transport_name(),
            retention_ms = self.config.cache_retention.as_millis() as u64,
            "application state ready"
        );
        AppState {
            config: Arc::new(self.config),
            router,
            cache,
        }
    }
}
