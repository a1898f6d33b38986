//! Real API transport.

use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde_json::Value;
use tracing::{debug, warn};
use valdora_config::{DEFAULT_API_TIMEOUT, FeatureConfiguration};
use valdora_core::{ApiError, ApiRequest, ApiResult, Method, Resource, Transport};

use crate::envelope::normalize_list;
use crate::middleware::AuthMiddleware;
use crate::token::{NoToken, TokenProvider};

/// Body fields searched, in order, for the message of an error response.
const MESSAGE_FIELDS: [&str; 4] = ["message", "detail", "hydra:description", "error"];

/// Sends logical requests to the back-office API over HTTP.
///
/// - The URL is the base URL, the request path and its list parameters.
/// - The whole exchange, body included, is bounded by the timeout; exceeding
///   it fails with [`ApiError::Timeout`].
/// - Failing to get a response at all is [`ApiError::Network`].
/// - Non-2xx answers become [`ApiError::Http`] with the server's message.
/// - 2xx JSON bodies are parsed, other bodies are returned as a JSON string,
///   empty bodies as `null`. List responses are normalized to
///   `{items, total, page, limit}`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use valdora_reqwest::{ReqwestTransport, SessionToken};
///
/// let session = SessionToken::default();
/// let transport = ReqwestTransport::builder("https://admin.example.test/api")
///     .timeout(Duration::from_secs(5))
///     .token_provider(session.clone())
///     .build();
/// assert_eq!(transport.base_url(), "https://admin.example.test/api");
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ClientWithMiddleware,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Starts a builder for `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new(base_url)
    }

    /// Transport using the configured base URL and timeout.
    pub fn from_config<T>(config: &FeatureConfiguration, tokens: T) -> Self
    where
        T: TokenProvider + 'static,
    {
        Self::builder(config.api_base_url.clone())
            .timeout(config.api_timeout)
            .token_provider(tokens)
            .build()
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Hard bound of one exchange.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL of `request`, with its list parameters as query string.
    pub fn url(&self, request: &ApiRequest) -> ApiResult<Url> {
        let raw = format!("{}{}", self.base_url, request.path());
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::Network(format!("invalid request URL `{raw}`: {e}")))?;
        let pairs = request.params.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    async fn exchange(&self, request: &ApiRequest) -> ApiResult<Value> {
        let url = self.url(request)?;
        let mut builder = self.client.request(to_http_method(request.method), url);
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Validation(e.to_string()))?;
            builder = builder.body(bytes);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        if !is_json {
            return Ok(Value::String(String::from_utf8_lossy(&body).into_owned()));
        }
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::Network(format!("malformed JSON response: {e}")))?;

        if is_list(request) {
            Ok(normalize_list(value, &request.params))
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        debug!(
            method = request.method.as_str(),
            path = %request.path(),
            "api request"
        );
        match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    path = %request.path(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "api request timed out"
                );
                Err(ApiError::Timeout(self.timeout))
            }
        }
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

/// Builder for [`ReqwestTransport`].
pub struct ReqwestTransportBuilder {
    base_url: String,
    timeout: Duration,
    client: Option<reqwest::Client>,
    tokens: Box<dyn TokenProvider>,
}

impl ReqwestTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: DEFAULT_API_TIMEOUT,
            client: None,
            tokens: Box::new(NoToken),
        }
    }

    /// Sets the hard bound of one exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses a preconfigured reqwest client (proxies, TLS roots, pools).
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the source of the session token.
    pub fn token_provider<T>(mut self, tokens: T) -> Self
    where
        T: TokenProvider + 'static,
    {
        self.tokens = Box::new(tokens);
        self
    }

    /// Builds the transport.
    pub fn build(self) -> ReqwestTransport {
        let client = ClientBuilder::new(self.client.unwrap_or_default())
            .with(AuthMiddleware::new(self.tokens))
            .build();
        ReqwestTransport {
            client,
            base_url: self.base_url,
            timeout: self.timeout,
        }
    }
}

fn to_http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn is_list(request: &ApiRequest) -> bool {
    request.method == Method::Get
        && request.id.is_none()
        && request.nested.is_none()
        && request.resource != Resource::Analytics
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    let from_json = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        MESSAGE_FIELDS
            .iter()
            .find_map(|field| value.get(*field).and_then(Value::as_str).map(str::to_owned))
    });
    if let Some(message) = from_json {
        return message;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_owned();
    }
    status
        .canonical_reason()
        .map_or_else(|| status.to_string(), str::to_owned)
}
