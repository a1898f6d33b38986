//! Request router: one entry point for the mock and the real API.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, info_span};
use valdora_config::FeatureConfiguration;
use valdora_core::{ApiRequest, ApiResponse, ApiResult, Transport};
use valdora_mock::MockDataProvider;
use valdora_reqwest::{ReqwestTransport, TokenProvider};

/// Executes logical requests against the transport picked at startup.
///
/// With `mocks_enabled` requests go to the in-memory [`MockDataProvider`],
/// otherwise to the HTTP API through [`ReqwestTransport`]. Either way the
/// caller gets data or an [`ApiError`](valdora_core::ApiError) with the same
/// envelope shape. The router holds no mutable state.
///
/// ```
/// use valdora::BaseQuery;
/// use valdora_config::FeatureConfiguration;
/// use valdora_reqwest::NoToken;
///
/// let config = FeatureConfiguration::builder().mocks_enabled(true).build();
/// let router = BaseQuery::from_config(&config, NoToken);
/// assert_eq!(router.transport_name(), "mock");
/// ```
#[derive(Clone)]
pub struct BaseQuery {
    transport: Arc<dyn Transport>,
}

impl BaseQuery {
    /// Router over any transport.
    pub fn new<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Router over the mock provider configured by `config` when
    /// `mocks_enabled`, or over the HTTP API authenticated with `tokens`.
    pub fn from_config<T>(config: &FeatureConfiguration, tokens: T) -> Self
    where
        T: TokenProvider + 'static,
    {
        if config.mocks_enabled {
            Self::new(MockDataProvider::from_config(config))
        } else {
            Self::new(ReqwestTransport::from_config(config, tokens))
        }
    }

    /// Name of the underlying transport (`mock`, `reqwest`, ...).
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Executes `request`.
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
        let span = info_span!(
            "api_request",
            transport = self.transport.name(),
            method = request.method.as_str(),
            path = %request.path(),
        );
        async move {
            let result = self.transport.send(request).await;
            if let Err(error) = &result {
                debug!(%error, status = %error.status(), "request failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Executes `request` and wraps the outcome in the logical envelope.
    pub async fn execute_envelope(&self, request: ApiRequest) -> ApiResponse {
        ApiResponse::from(self.execute(request).await)
    }
}

impl fmt::Debug for BaseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseQuery")
            .field("transport", &self.transport.name())
            .finish()
    }
}
