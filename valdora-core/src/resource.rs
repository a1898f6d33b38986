//! Resources served by the data layer and the methods that act on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tag::ResourceTag;

/// A logical resource exposed by the back-office API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    /// Customer organisations.
    Tenant,
    /// Orders placed by tenant customers.
    Order,
    /// AI store wizard drafts.
    AiStoreDraft,
    /// Back-office users.
    User,
    /// Named groups of permissions.
    Role,
    /// Individual grants such as `tenants.read`.
    Permission,
    /// Read-only dashboard summary.
    Analytics,
}

impl Resource {
    /// Every resource, in declaration order.
    pub const ALL: [Resource; 7] = [
        Resource::Tenant,
        Resource::Order,
        Resource::AiStoreDraft,
        Resource::User,
        Resource::Role,
        Resource::Permission,
        Resource::Analytics,
    ];

    /// Returns the resource name used in tags and error messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Resource::Tenant => "Tenant",
            Resource::Order => "Order",
            Resource::AiStoreDraft => "AiStoreDraft",
            Resource::User => "User",
            Resource::Role => "Role",
            Resource::Permission => "Permission",
            Resource::Analytics => "Analytics",
        }
    }

    /// Returns the URL path segment of the resource collection.
    pub const fn path(&self) -> &'static str {
        match self {
            Resource::Tenant => "tenants",
            Resource::Order => "orders",
            Resource::AiStoreDraft => "ai-store-drafts",
            Resource::User => "users",
            Resource::Role => "roles",
            Resource::Permission => "permissions",
            Resource::Analytics => "analytics",
        }
    }

    /// Returns the cache tag kind that entries of this resource carry.
    pub const fn tag(&self) -> ResourceTag {
        match self {
            Resource::Tenant => ResourceTag::Tenant,
            Resource::Order => ResourceTag::Order,
            Resource::AiStoreDraft => ResourceTag::AiStoreDraft,
            Resource::User => ResourceTag::User,
            Resource::Role => ResourceTag::Role,
            Resource::Permission => ResourceTag::Permission,
            Resource::Analytics => ResourceTag::Analytics,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource: {0}")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    /// Accepts both the resource name (`Tenant`) and its path (`tenants`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s) || r.path() == s)
            .ok_or_else(|| UnknownResource(s.to_owned()))
    }
}

/// HTTP-style verb of a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read a collection or a single entity.
    #[default]
    Get,
    /// Create an entity or a relation.
    Post,
    /// Replace fields of an entity.
    Put,
    /// Merge fields into an entity.
    Patch,
    /// Remove an entity or a relation.
    Delete,
}

impl Method {
    /// Returns the upper-case verb.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the method only reads state.
    pub const fn is_read(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_name_or_path() {
        assert_eq!("Tenant".parse::<Resource>(), Ok(Resource::Tenant));
        assert_eq!("tenant".parse::<Resource>(), Ok(Resource::Tenant));
        assert_eq!("ai-store-drafts".parse::<Resource>(), Ok(Resource::AiStoreDraft));
        assert!("widgets".parse::<Resource>().is_err());
    }

    #[test]
    fn test_method_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Method::Patch).unwrap(), "\"PATCH\"");
        assert!(Method::Get.is_read());
        assert!(!Method::Delete.is_read());
    }
}
