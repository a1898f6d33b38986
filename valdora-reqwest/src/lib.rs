#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # valdora-reqwest
//!
//! Real API transport for the Valdora data layer, built on
//! [`reqwest`] and [`reqwest-middleware`](reqwest_middleware).
//!
//! [`ReqwestTransport`] implements [`Transport`](valdora_core::Transport):
//! it turns an [`ApiRequest`](valdora_core::ApiRequest) into an HTTP call
//! against the configured base URL, bounded by the configured timeout, and
//! maps the answer into data or an [`ApiError`](valdora_core::ApiError).
//!
//! [`AuthMiddleware`] adds the JSON headers and the session's bearer token,
//! read from a [`TokenProvider`] on every request so sign-in and sign-out
//! take effect immediately.
//!
//! ```no_run
//! use valdora_config::FeatureConfiguration;
//! use valdora_core::{ApiRequest, ListParams, Resource, Transport};
//! use valdora_reqwest::{ReqwestTransport, SessionToken};
//!
//! # async fn run() -> valdora_core::ApiResult<()> {
//! let session = SessionToken::default();
//! session.set("token-from-login");
//!
//! let transport = ReqwestTransport::from_config(FeatureConfiguration::current(), session);
//! let page = transport
//!     .send(ApiRequest::list(Resource::Tenant, ListParams::new().limit(20)))
//!     .await?;
//! println!("{} tenants", page["total"]);
//! # Ok(())
//! # }
//! ```

mod envelope;
mod middleware;
mod token;
mod transport;

pub use envelope::normalize_list;
pub use middleware::AuthMiddleware;
pub use token::{NoToken, SessionToken, StaticToken, TokenProvider};
pub use transport::{ReqwestTransport, ReqwestTransportBuilder};
