//! Header middleware for reqwest-middleware.

use async_trait::async_trait;
use http::Extensions;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::warn;

use crate::token::TokenProvider;

/// Adds the API headers to every request.
///
/// - `Content-Type` and `Accept` default to `application/json`; headers set
///   on the request itself win.
/// - `Authorization: Bearer <token>` is attached whenever the
///   [`TokenProvider`] has a token, and marked sensitive so it stays out of
///   debug output.
///
/// # Example
///
/// ```
/// use reqwest_middleware::ClientBuilder;
/// use valdora_reqwest::{AuthMiddleware, SessionToken};
///
/// let session = SessionToken::default();
/// let client = ClientBuilder::new(reqwest::Client::new())
///     .with(AuthMiddleware::new(session.clone()))
///     .build();
/// session.set("token-from-login");
/// ```
#[derive(Debug, Clone)]
pub struct AuthMiddleware<T> {
    tokens: T,
}

impl<T> AuthMiddleware<T> {
    /// Creates the middleware over a token source.
    pub fn new(tokens: T) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl<T> Middleware for AuthMiddleware<T>
where
    T: TokenProvider + 'static,
{
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let headers = req.headers_mut();
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        if let Some(token) = self.tokens.token() {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("session token is not a valid header value, sending without it"),
            }
        }

        next.run(req, extensions).await
    }
}
