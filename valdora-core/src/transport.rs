//! Transport trait: where a logical request is actually executed.
//!
//! The data layer has two transports: the in-memory mock provider and the
//! real HTTP client. Both turn an [`ApiRequest`] into JSON data or an
//! [`ApiError`], so the router can pick one at startup and the rest of the
//! stack never knows which.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::request::ApiRequest;

/// Executes logical requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes `request` and returns its JSON payload.
    async fn send(&self, request: ApiRequest) -> ApiResult<Value>;

    /// Returns the name of this transport for logging.
    fn name(&self) -> &str {
        "transport"
    }
}

#[async_trait]
impl Transport for &dyn Transport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        (*self).send(request).await
    }

    fn name(&self) -> &str {
        (*self).name()
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl Transport for Arc<dyn Transport> {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
