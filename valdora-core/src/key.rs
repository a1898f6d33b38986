//! Cache key types and construction.
//!
//! A [`QueryKey`] identifies a cached query by its endpoint and its
//! serialized parameters. Parameters are sorted by name on construction so
//! that the same logical query always produces the same key.
//!
//! ## Format
//!
//! `{endpoint}?key1=value1&key2=value2`, with the `?` part omitted when there
//! are no parameters and `=value` omitted for flag parts.
//!
//! ```
//! use valdora_core::{KeyPart, QueryKey};
//!
//! let key = QueryKey::new("tenants", vec![
//!     KeyPart::new("page", Some("1")),
//!     KeyPart::new("limit", Some("10")),
//! ]);
//! assert_eq!(key.to_string(), "tenants?limit=10&page=1");
//!
//! let key = QueryKey::new("analytics", vec![]);
//! assert_eq!(key.to_string(), "analytics");
//! ```
//!
//! [`QueryKey`] wraps its data in an `Arc`, so cloning a key only bumps a
//! reference count. [`KeyPart`] uses [`SmolStr`] so short parts stay inline.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::request::ApiRequest;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct QueryKeyInner {
    endpoint: SmolStr,
    parts: Vec<KeyPart>,
}

/// Key of a cached query: endpoint plus sorted parameters.
#[derive(Clone, Debug)]
pub struct QueryKey {
    inner: Arc<QueryKeyInner>,
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.endpoint)?;
        for (i, part) in self.inner.parts.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl QueryKey {
    /// Creates a key. Parts are sorted by key name, then value.
    pub fn new(endpoint: impl Into<SmolStr>, mut parts: Vec<KeyPart>) -> Self {
        parts.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.value.cmp(&b.value)));
        QueryKey {
            inner: Arc::new(QueryKeyInner {
                endpoint: endpoint.into(),
                parts,
            }),
        }
    }

    /// Derives the key of a read request: its path plus its list parameters.
    ///
    /// ```
    /// use valdora_core::{ApiRequest, ListParams, QueryKey, Resource};
    ///
    /// let request = ApiRequest::list(Resource::Tenant, ListParams::new().search("tech").page(1));
    /// assert_eq!(QueryKey::from_request(&request).to_string(), "/tenants?page=1&search=tech");
    /// ```
    pub fn from_request(request: &ApiRequest) -> Self {
        let parts = request
            .params
            .to_pairs()
            .into_iter()
            .map(|(key, value)| KeyPart::new(key, Some(value)))
            .collect();
        QueryKey::new(request.path(), parts)
    }

    /// Returns the endpoint part of the key.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Returns an iterator over the key parts.
    pub fn parts(&self) -> impl Iterator<Item = &KeyPart> {
        self.inner.parts.iter()
    }
}

/// A single parameter of a query key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct KeyPart {
    key: SmolStr,
    value: Option<SmolStr>,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if let Some(ref value) = self.value {
            write!(f, "={}", value)?;
        }
        Ok(())
    }
}

impl KeyPart {
    /// Creates a new key part.
    pub fn new<K: AsRef<str>, V: AsRef<str>>(key: K, value: Option<V>) -> Self {
        KeyPart {
            key: SmolStr::new(key),
            value: value.map(SmolStr::new),
        }
    }

    /// Returns the key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the optional value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}
