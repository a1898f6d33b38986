#![warn(missing_docs)]
//! # valdora-core
//!
//! Shared vocabulary of the Valdora back-office data layer.
//!
//! This crate defines the types every other crate agrees on, so the mock
//! provider, the HTTP client and the query cache can be swapped and composed
//! without knowing about each other:
//!
//! - **Address** data: [`Resource`], [`Method`], [`ApiRequest`], [`ListParams`]
//! - **Key** cached queries: [`QueryKey`], [`KeyPart`]
//! - **Group** cache entries for invalidation: [`ResourceTag`], [`Tag`], [`TagSet`]
//! - **Answer** views: [`ApiResponse`], [`ErrorEnvelope`], [`Page`], [`ApiError`]
//! - **Execute** requests: [`Transport`]

pub mod error;
pub mod id;
pub mod key;
pub mod request;
pub mod resource;
pub mod response;
pub mod tag;
pub mod transport;

pub use error::{ApiError, ApiResult, ErrorKind, MockFailure};
pub use id::EntityId;
pub use key::{KeyPart, QueryKey};
pub use request::{ApiRequest, DEFAULT_LIMIT, ListParams, Nested};
pub use resource::{Method, Resource, UnknownResource};
pub use response::{ApiResponse, ErrorEnvelope, ErrorStatus, Page};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use tag::{ResourceTag, Tag, TagId, TagSet};
pub use transport::Transport;
