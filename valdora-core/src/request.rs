//! Logical request shape consumed by the router.
//!
//! An [`ApiRequest`] names a resource, an optional entity id, an optional
//! nested relation (`/users/1/roles/2`), a method, list parameters and an
//! optional JSON body. Transports turn it into a mock call or a network call.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::EntityId;
use crate::resource::{Method, Resource};

/// Default page size applied when a list request carries no `limit`.
pub const DEFAULT_LIMIT: u32 = 10;

/// Filtering and pagination parameters of a list request.
///
/// ```
/// use valdora_core::ListParams;
///
/// let params = ListParams::new().search("tech").page(2).limit(5);
/// assert_eq!(params.effective_page(), 2);
/// assert_eq!(params.effective_limit(), 5);
/// assert_eq!(ListParams::new().effective_limit(), 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring over the resource's searchable fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact status value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// 1-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListParams {
    /// Empty parameters: no filter, first page, default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the case-insensitive search term.
    pub fn search(self, search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..self
        }
    }

    /// Sets the status equality filter.
    pub fn status(self, status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..self
        }
    }

    /// Sets the 1-based page number.
    pub fn page(self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self
        }
    }

    /// Sets the page size.
    pub fn limit(self, limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..self
        }
    }

    /// Page number with `None` and `0` mapped to 1.
    pub fn effective_page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    /// Page size with `None` and `0` mapped to [`DEFAULT_LIMIT`].
    pub fn effective_limit(&self) -> u32 {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT)
    }

    /// Parameters as query pairs, in a stable order. Empty search/status are skipped.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_owned()));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("status", status.to_owned()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.to_pairs().is_empty()
    }
}

/// Nested relation segment such as `roles/2` in `/users/1/roles/2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nested {
    /// Related resource.
    pub resource: Resource,
    /// Related entity, absent for the relation listing.
    pub id: Option<EntityId>,
}

/// A logical request: `{resource, id?, method, params?, body?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Target resource.
    pub resource: Resource,
    /// Target entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Nested relation segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Nested>,
    /// Verb.
    #[serde(default)]
    pub method: Method,
    /// List parameters.
    #[serde(default, skip_serializing_if = "ListParams::is_empty")]
    pub params: ListParams,
    /// JSON payload of create/update requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a bare request for `resource` with `method`.
    pub fn new(resource: Resource, method: Method) -> Self {
        Self {
            resource,
            id: None,
            nested: None,
            method,
            params: ListParams::default(),
            body: None,
        }
    }

    /// `GET /{resource}` with list parameters.
    pub fn list(resource: Resource, params: ListParams) -> Self {
        Self::new(resource, Method::Get).with_params(params)
    }

    /// `GET /{resource}/{id}`.
    pub fn get(resource: Resource, id: impl Into<EntityId>) -> Self {
        Self::new(resource, Method::Get).with_id(id)
    }

    /// `POST /{resource}`.
    pub fn create(resource: Resource, body: Value) -> Self {
        Self::new(resource, Method::Post).with_body(body)
    }

    /// `PATCH /{resource}/{id}`.
    pub fn update(resource: Resource, id: impl Into<EntityId>, patch: Value) -> Self {
        Self::new(resource, Method::Patch).with_id(id).with_body(patch)
    }

    /// `DELETE /{resource}/{id}`.
    pub fn delete(resource: Resource, id: impl Into<EntityId>) -> Self {
        Self::new(resource, Method::Delete).with_id(id)
    }

    /// Sets the entity id.
    pub fn with_id(self, id: impl Into<EntityId>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    /// Sets the nested relation segment.
    pub fn with_nested(self, resource: Resource, id: Option<EntityId>) -> Self {
        Self {
            nested: Some(Nested { resource, id }),
            ..self
        }
    }

    /// Sets the list parameters.
    pub fn with_params(self, params: ListParams) -> Self {
        Self { params, ..self }
    }

    /// Sets the JSON body.
    pub fn with_body(self, body: Value) -> Self {
        Self {
            body: Some(body),
            ..self
        }
    }

    /// Resource path relative to the API base URL, e.g. `/users/1/roles/2`.
    pub fn path(&self) -> String {
        let mut path = format!("/{}", self.resource.path());
        if let Some(id) = &self.id {
            let _ = write!(path, "/{id}");
        }
        if let Some(nested) = &self.nested {
            let _ = write!(path, "/{}", nested.resource.path());
            if let Some(id) = &nested.id {
                let _ = write!(path, "/{id}");
            }
        }
        path
    }
}
