//! Catalogue of the dashboard's endpoints.
//!
//! Every request the dashboard makes is one [`Endpoint`] variant. A variant
//! knows its [`ApiRequest`], its cache [`QueryKey`], the tags a cached result
//! provides and the tags a successful mutation invalidates, so nothing is
//! derived from URL strings at runtime.
//!
//! | variant | request | provides / invalidates |
//! |---|---|---|
//! | `List(r, params)` | `GET /r?…` | `r:LIST` |
//! | `Get(r, id)` | `GET /r/{id}` | `r:{id}` |
//! | `Create(r, body)` | `POST /r` | `r:LIST` |
//! | `Update(r, id, body)` | `PATCH /r/{id}` | `r:{id}`, `r:LIST` |
//! | `Delete(r, id)` | `DELETE /r/{id}` | `r:{id}`, `r:LIST` |
//! | `Analytics` | `GET /analytics` | `Analytics:LIST` |
//! | `ListUserRoles` | `GET /users/{u}/roles` | `User:{u}`, `Role:LIST` |
//! | `AssignRoleToUser` | `POST /users/{u}/roles/{r}` | `User:{u}`, `User:LIST` |
//! | `RevokeRoleFromUser` | `DELETE /users/{u}/roles/{r}` | `User:{u}`, `User:LIST` |
//! | `ListRolePermissions` | `GET /roles/{r}/permissions` | `Role:{r}`, `Permission:LIST` |
//! | `GrantPermissionToRole` | `POST /roles/{r}/permissions/{p}` | `Role:{r}`, `Role:LIST` |
//! | `RevokePermissionFromRole` | `DELETE /roles/{r}/permissions/{p}` | `Role:{r}`, `Role:LIST` |
//!
//! Writes to tenants, orders, drafts and users also invalidate `Analytics`,
//! whose summary is computed from them.

use serde_json::Value;
use valdora_core::{
    ApiRequest, EntityId, ListParams, Method, QueryKey, Resource, ResourceTag, Tag, TagSet,
};

/// A request of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Paginated, filtered collection listing.
    List(Resource, ListParams),
    /// One entity.
    Get(Resource, EntityId),
    /// Creates an entity from a JSON payload.
    Create(Resource, Value),
    /// Merges a JSON patch into an entity.
    Update(Resource, EntityId, Value),
    /// Deletes an entity.
    Delete(Resource, EntityId),
    /// Dashboard summary.
    Analytics,
    /// Roles assigned to a user.
    ListUserRoles {
        /// The user.
        user_id: EntityId,
    },
    /// Assigns a role to a user.
    AssignRoleToUser {
        /// The user.
        user_id: EntityId,
        /// The role.
        role_id: EntityId,
    },
    /// Revokes a role from a user.
    RevokeRoleFromUser {
        /// The user.
        user_id: EntityId,
        /// The role.
        role_id: EntityId,
    },
    /// Permissions granted to a role.
    ListRolePermissions {
        /// The role.
        role_id: EntityId,
    },
    /// Grants a permission to a role.
    GrantPermissionToRole {
        /// The role.
        role_id: EntityId,
        /// The permission.
        permission_id: EntityId,
    },
    /// Revokes a permission from a role.
    RevokePermissionFromRole {
        /// The role.
        role_id: EntityId,
        /// The permission.
        permission_id: EntityId,
    },
}

impl Endpoint {
    /// Whether the endpoint reads data (and can be cached).
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Endpoint::List(..)
                | Endpoint::Get(..)
                | Endpoint::Analytics
                | Endpoint::ListUserRoles { .. }
                | Endpoint::ListRolePermissions { .. }
        )
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::List(..) => "list",
            Endpoint::Get(..) => "get",
            Endpoint::Create(..) => "create",
            Endpoint::Update(..) => "update",
            Endpoint::Delete(..) => "delete",
            Endpoint::Analytics => "analytics",
            Endpoint::ListUserRoles { .. } => "list_user_roles",
            Endpoint::AssignRoleToUser { .. } => "assign_role_to_user",
            Endpoint::RevokeRoleFromUser { .. } => "revoke_role_from_user",
            Endpoint::ListRolePermissions { .. } => "list_role_permissions",
            Endpoint::GrantPermissionToRole { .. } => "grant_permission_to_role",
            Endpoint::RevokePermissionFromRole { .. } => "revoke_permission_from_role",
        }
    }

    /// Resource whose feature toggle governs the endpoint.
    pub fn resource(&self) -> Resource {
        match self {
            Endpoint::List(resource, _)
            | Endpoint::Get(resource, _)
            | Endpoint::Create(resource, _)
            | Endpoint::Update(resource, _, _)
            | Endpoint::Delete(resource, _) => *resource,
            Endpoint::Analytics => Resource::Analytics,
            Endpoint::ListUserRoles { .. }
            | Endpoint::AssignRoleToUser { .. }
            | Endpoint::RevokeRoleFromUser { .. } => Resource::User,
            Endpoint::ListRolePermissions { .. }
            | Endpoint::GrantPermissionToRole { .. }
            | Endpoint::RevokePermissionFromRole { .. } => Resource::Role,
        }
    }

    /// Name of the feature toggle that must be on, if any.
    ///
    /// ```
    /// use valdora::Endpoint;
    /// use valdora_core::Resource;
    ///
    /// assert_eq!(Endpoint::Analytics.feature(), Some("analytics"));
    /// assert_eq!(Endpoint::Get(Resource::Role, "1".into()).feature(), Some("user_management"));
    /// assert_eq!(Endpoint::Get(Resource::Tenant, "1".into()).feature(), None);
    /// ```
    pub fn feature(&self) -> Option<&'static str> {
        match self.resource() {
            Resource::Tenant => None,
            Resource::Order => Some("orders"),
            Resource::AiStoreDraft => Some("ai_store_wizard"),
            Resource::User | Resource::Role | Resource::Permission => Some("user_management"),
            Resource::Analytics => Some("analytics"),
        }
    }

    /// The logical request.
    pub fn request(&self) -> ApiRequest {
        match self {
            Endpoint::List(resource, params) => ApiRequest::list(*resource, params.clone()),
            Endpoint::Get(resource, id) => ApiRequest::get(*resource, id.clone()),
            Endpoint::Create(resource, body) => ApiRequest::create(*resource, body.clone()),
            Endpoint::Update(resource, id, body) => {
                ApiRequest::update(*resource, id.clone(), body.clone())
            }
            Endpoint::Delete(resource, id) => ApiRequest::delete(*resource, id.clone()),
            Endpoint::Analytics => ApiRequest::new(Resource::Analytics, Method::Get),
            Endpoint::ListUserRoles { user_id } => ApiRequest::new(Resource::User, Method::Get)
                .with_id(user_id.clone())
                .with_nested(Resource::Role, None),
            Endpoint::AssignRoleToUser { user_id, role_id } => {
                ApiRequest::new(Resource::User, Method::Post)
                    .with_id(user_id.clone())
                    .with_nested(Resource::Role, Some(role_id.clone()))
            }
            Endpoint::RevokeRoleFromUser { user_id, role_id } => {
                ApiRequest::new(Resource::User, Method::Delete)
                    .with_id(user_id.clone())
                    .with_nested(Resource::Role, Some(role_id.clone()))
            }
            Endpoint::ListRolePermissions { role_id } => {
                ApiRequest::new(Resource::Role, Method::Get)
                    .with_id(role_id.clone())
                    .with_nested(Resource::Permission, None)
            }
            Endpoint::GrantPermissionToRole {
                role_id,
                permission_id,
            } => ApiRequest::new(Resource::Role, Method::Post)
                .with_id(role_id.clone())
                .with_nested(Resource::Permission, Some(permission_id.clone())),
            Endpoint::RevokePermissionFromRole {
                role_id,
                permission_id,
            } => ApiRequest::new(Resource::Role, Method::Delete)
                .with_id(role_id.clone())
                .with_nested(Resource::Permission, Some(permission_id.clone())),
        }
    }

    /// Cache key of the request: path plus list parameters. Mutations are
    /// prefixed with their method so they never share a read's key.
    ///
    /// ```
    /// use valdora::Endpoint;
    /// use valdora_core::{ListParams, Resource};
    ///
    /// let endpoint = Endpoint::List(Resource::Tenant, ListParams::new().status("active"));
    /// assert_eq!(endpoint.key().to_string(), "/tenants?status=active");
    ///
    /// let delete = Endpoint::Delete(Resource::Tenant, "1".into());
    /// assert_eq!(delete.key().to_string(), "DELETE /tenants/1");
    /// ```
    pub fn key(&self) -> QueryKey {
        let request = self.request();
        if self.is_query() {
            QueryKey::from_request(&request)
        } else {
            QueryKey::new(
                format!("{} {}", request.method.as_str(), request.path()),
                Vec::new(),
            )
        }
    }

    /// Tags a cached result of this endpoint provides. Empty for mutations.
    pub fn provides(&self) -> TagSet {
        match self {
            Endpoint::List(resource, _) => TagSet::from([Tag::list(resource.tag())]),
            Endpoint::Get(resource, id) => TagSet::from([Tag::entity(resource.tag(), id.clone())]),
            Endpoint::Analytics => TagSet::from([Tag::list(ResourceTag::Analytics)]),
            Endpoint::ListUserRoles { user_id } => TagSet::from([
                Tag::entity(ResourceTag::User, user_id.clone()),
                Tag::list(ResourceTag::Role),
            ]),
            Endpoint::ListRolePermissions { role_id } => TagSet::from([
                Tag::entity(ResourceTag::Role, role_id.clone()),
                Tag::list(ResourceTag::Permission),
            ]),
            _ => TagSet::new(),
        }
    }

    /// Tags a successful call of this endpoint invalidates. Empty for queries.
    pub fn invalidates(&self) -> Vec<Tag> {
        let mut tags = match self {
            Endpoint::Create(resource, _) => vec![Tag::list(resource.tag())],
            Endpoint::Update(resource, id, _) | Endpoint::Delete(resource, id) => vec![
                Tag::entity(resource.tag(), id.clone()),
                Tag::list(resource.tag()),
            ],
            Endpoint::AssignRoleToUser { user_id, .. }
            | Endpoint::RevokeRoleFromUser { user_id, .. } => vec![
                Tag::entity(ResourceTag::User, user_id.clone()),
                Tag::list(ResourceTag::User),
            ],
            Endpoint::GrantPermissionToRole { role_id, .. }
            | Endpoint::RevokePermissionFromRole { role_id, .. } => vec![
                Tag::entity(ResourceTag::Role, role_id.clone()),
                Tag::list(ResourceTag::Role),
            ],
            _ => return Vec::new(),
        };
        if feeds_analytics(self.resource()) {
            tags.push(Tag::kind(ResourceTag::Analytics));
        }
        tags
    }
}

fn feeds_analytics(resource: Resource) -> bool {
    matches!(
        resource,
        Resource::Tenant | Resource::Order | Resource::AiStoreDraft | Resource::User
    )
}
