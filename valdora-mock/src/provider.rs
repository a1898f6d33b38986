//! The mock data provider and its request routing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use valdora_config::FeatureConfiguration;
use valdora_core::{
    ApiRequest, ApiResult, EntityId, ListParams, Method, Nested, Page, Resource, Transport,
};

use crate::analytics::AnalyticsSummary;
use crate::builder::MockDataProviderBuilder;
use crate::collection::{Collection, JsonCollection};
use crate::entity::{AiStoreDraft, Order, Permission, Role, Tenant, User};
use crate::error::MockError;

#[derive(Debug, Default)]
pub(crate) struct Store {
    pub(crate) tenants: Collection<Tenant>,
    pub(crate) orders: Collection<Order>,
    pub(crate) drafts: Collection<AiStoreDraft>,
    pub(crate) users: Collection<User>,
    pub(crate) roles: Collection<Role>,
    pub(crate) permissions: Collection<Permission>,
}

/// In-memory stand-in for the back-office API.
///
/// Every public operation first waits for the provider's artificial delay,
/// then acts on typed collections. Clones and [`with_delay`](Self::with_delay)
/// handles share the same collections.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use valdora_core::{ListParams, Resource};
/// use valdora_mock::MockDataProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let provider = MockDataProvider::seeded().with_delay(Duration::ZERO);
/// let page = provider
///     .list(Resource::Tenant, &ListParams::new().search("tech"))
///     .await
///     .unwrap();
/// assert_eq!(page.total, 1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockDataProvider {
    store: Arc<Store>,
    delay: Duration,
}

impl MockDataProvider {
    /// Creates a builder with empty collections and the default delay.
    pub fn builder() -> MockDataProviderBuilder {
        MockDataProviderBuilder::default()
    }

    /// Provider over the fixture dataset with the default one second delay.
    pub fn seeded() -> Self {
        Self::builder().seed().build()
    }

    /// Provider with no data and the default delay.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Seeded provider using the configured mock delay.
    pub fn from_config(config: &FeatureConfiguration) -> Self {
        Self::builder().seed().delay(config.mock_delay).build()
    }

    pub(crate) fn from_parts(store: Store, delay: Duration) -> Self {
        Self {
            store: Arc::new(store),
            delay,
        }
    }

    /// Handle on the same collections with a different delay.
    pub fn with_delay(&self, delay: Duration) -> Self {
        Self {
            store: Arc::clone(&self.store),
            delay,
        }
    }

    /// Artificial latency applied before every operation.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Direct access to the tenants, without delay.
    pub fn tenants(&self) -> &Collection<Tenant> {
        &self.store.tenants
    }

    /// Direct access to the orders, without delay.
    pub fn orders(&self) -> &Collection<Order> {
        &self.store.orders
    }

    /// Direct access to the AI store drafts, without delay.
    pub fn ai_store_drafts(&self) -> &Collection<AiStoreDraft> {
        &self.store.drafts
    }

    /// Direct access to the users, without delay.
    pub fn users(&self) -> &Collection<User> {
        &self.store.users
    }

    /// Direct access to the roles, without delay.
    pub fn roles(&self) -> &Collection<Role> {
        &self.store.roles
    }

    /// Direct access to the permissions, without delay.
    pub fn permissions(&self) -> &Collection<Permission> {
        &self.store.permissions
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn collection(&self, resource: Resource) -> Result<&dyn JsonCollection, MockError> {
        let collection: &dyn JsonCollection = match resource {
            Resource::Tenant => &self.store.tenants,
            Resource::Order => &self.store.orders,
            Resource::AiStoreDraft => &self.store.drafts,
            Resource::User => &self.store.users,
            Resource::Role => &self.store.roles,
            Resource::Permission => &self.store.permissions,
            Resource::Analytics => {
                return Err(MockError::Unsupported(
                    "analytics is not an entity collection".into(),
                ));
            }
        };
        Ok(collection)
    }

    /// Filtered, paginated listing.
    pub async fn list(
        &self,
        resource: Resource,
        params: &ListParams,
    ) -> Result<Page<Value>, MockError> {
        self.pause().await;
        self.collection(resource)?.list_json(params).await
    }

    /// Single entity, `NotFound` when absent.
    pub async fn get(&self, resource: Resource, id: &EntityId) -> Result<Value, MockError> {
        self.pause().await;
        self.collection(resource)?.get_json(id).await
    }

    /// Creates an entity from `payload` merged over the resource defaults.
    pub async fn create(&self, resource: Resource, payload: Value) -> Result<Value, MockError> {
        self.pause().await;
        self.collection(resource)?
            .create_json(payload, Utc::now())
            .await
    }

    /// Merges `patch` over an existing entity.
    ///
    /// Only fields the entity models are kept: anything else in `patch` is
    /// dropped when the merged value is read back into the entity, and the
    /// returned value reflects what was stored.
    pub async fn update(
        &self,
        resource: Resource,
        id: &EntityId,
        patch: Value,
    ) -> Result<Value, MockError> {
        self.pause().await;
        self.collection(resource)?
            .update_json(id, patch, Utc::now())
            .await
    }

    /// Removes an entity.
    pub async fn delete(&self, resource: Resource, id: &EntityId) -> Result<(), MockError> {
        self.pause().await;
        self.collection(resource)?.delete_json(id).await
    }

    /// Roles assigned to a user.
    pub async fn user_roles(&self, user_id: &EntityId) -> Result<Vec<Role>, MockError> {
        self.pause().await;
        let user = self.store.users.get(user_id).await?;
        let roles = self.store.roles.all().await;
        Ok(roles
            .into_iter()
            .filter(|role| user.role_ids.contains(&role.id))
            .collect())
    }

    /// Assigns a role to a user. Assigning twice is a no-op.
    pub async fn assign_role(
        &self,
        user_id: &EntityId,
        role_id: &EntityId,
    ) -> Result<User, MockError> {
        self.pause().await;
        if !self.store.roles.contains(role_id).await {
            return Err(MockError::not_found(Resource::Role, role_id));
        }
        let role_id = role_id.clone();
        self.store
            .users
            .modify(user_id, Utc::now(), move |user| {
                if user.role_ids.contains(&role_id) {
                    return false;
                }
                user.role_ids.push(role_id);
                true
            })
            .await
    }

    /// Revokes a role from a user. Revoking an unassigned role is a no-op.
    pub async fn revoke_role(
        &self,
        user_id: &EntityId,
        role_id: &EntityId,
    ) -> Result<User, MockError> {
        self.pause().await;
        let user = self.store.users.get(user_id).await?;
        if !user.role_ids.contains(role_id) && !self.store.roles.contains(role_id).await {
            return Err(MockError::not_found(Resource::Role, role_id));
        }
        self.store
            .users
            .modify(user_id, Utc::now(), |user| remove_id(&mut user.role_ids, role_id))
            .await
    }

    /// Permissions granted to a role.
    pub async fn role_permissions(&self, role_id: &EntityId) -> Result<Vec<Permission>, MockError> {
        self.pause().await;
        let role = self.store.roles.get(role_id).await?;
        let permissions = self.store.permissions.all().await;
        Ok(permissions
            .into_iter()
            .filter(|permission| role.permission_ids.contains(&permission.id))
            .collect())
    }

    /// Grants a permission to a role. Granting twice is a no-op.
    pub async fn grant_permission(
        &self,
        role_id: &EntityId,
        permission_id: &EntityId,
    ) -> Result<Role, MockError> {
        self.pause().await;
        if !self.store.permissions.contains(permission_id).await {
            return Err(MockError::not_found(Resource::Permission, permission_id));
        }
        let permission_id = permission_id.clone();
        self.store
            .roles
            .modify(role_id, Utc::now(), move |role| {
                if role.permission_ids.contains(&permission_id) {
                    return false;
                }
                role.permission_ids.push(permission_id);
                true
            })
            .await
    }

    /// Revokes a permission from a role. Revoking an ungranted permission is a no-op.
    pub async fn revoke_permission(
        &self,
        role_id: &EntityId,
        permission_id: &EntityId,
    ) -> Result<Role, MockError> {
        self.pause().await;
        let role = self.store.roles.get(role_id).await?;
        if !role.permission_ids.contains(permission_id)
            && !self.store.permissions.contains(permission_id).await
        {
            return Err(MockError::not_found(Resource::Permission, permission_id));
        }
        self.store
            .roles
            .modify(role_id, Utc::now(), |role| {
                remove_id(&mut role.permission_ids, permission_id)
            })
            .await
    }

    /// Summary of every collection.
    pub async fn analytics(&self) -> AnalyticsSummary {
        self.pause().await;
        AnalyticsSummary::compute(
            &self.store.tenants.all().await,
            &self.store.orders.all().await,
            &self.store.drafts.all().await,
            &self.store.users.all().await,
        )
    }

    /// Routes a logical request to the matching operation.
    ///
    /// `GET` lists or reads depending on the presence of an id, `POST` creates,
    /// `PUT`/`PATCH` update and `DELETE` removes. Nested `users/{id}/roles` and
    /// `roles/{id}/permissions` requests reach the relation operations.
    pub async fn handle(&self, request: ApiRequest) -> Result<Value, MockError> {
        debug!(
            method = request.method.as_str(),
            path = %request.path(),
            "mock request"
        );
        let ApiRequest {
            resource,
            id,
            nested,
            method,
            params,
            body,
        } = request;

        if let Some(nested) = nested {
            let parent =
                id.ok_or_else(|| unsupported(method, resource, "nested route without id"))?;
            return self.handle_nested(resource, &parent, nested, method).await;
        }

        if resource == Resource::Analytics {
            return match (method, id) {
                (Method::Get, None) => Ok(serde_json::to_value(self.analytics().await)?),
                _ => Err(unsupported(method, resource, "analytics is read-only")),
            };
        }

        match (method, id) {
            (Method::Get, None) => Ok(serde_json::to_value(self.list(resource, &params).await?)?),
            (Method::Get, Some(id)) => self.get(resource, &id).await,
            (Method::Post, None) => self.create(resource, require_body(body)?).await,
            (Method::Put | Method::Patch, Some(id)) => {
                self.update(resource, &id, require_body(body)?).await
            }
            (Method::Delete, Some(id)) => self.delete(resource, &id).await.map(|()| Value::Null),
            (Method::Post, Some(_)) => Err(unsupported(method, resource, "create takes no id")),
            (Method::Put | Method::Patch | Method::Delete, None) => {
                Err(unsupported(method, resource, "an id is required"))
            }
        }
    }

    async fn handle_nested(
        &self,
        resource: Resource,
        parent: &EntityId,
        nested: Nested,
        method: Method,
    ) -> Result<Value, MockError> {
        match (resource, nested.resource, method, nested.id) {
            (Resource::User, Resource::Role, Method::Get, None) => {
                Ok(serde_json::to_value(self.user_roles(parent).await?)?)
            }
            (Resource::User, Resource::Role, Method::Post | Method::Put, Some(role)) => {
                Ok(serde_json::to_value(self.assign_role(parent, &role).await?)?)
            }
            (Resource::User, Resource::Role, Method::Delete, Some(role)) => {
                Ok(serde_json::to_value(self.revoke_role(parent, &role).await?)?)
            }
            (Resource::Role, Resource::Permission, Method::Get, None) => {
                Ok(serde_json::to_value(self.role_permissions(parent).await?)?)
            }
            (Resource::Role, Resource::Permission, Method::Post | Method::Put, Some(permission)) => {
                Ok(serde_json::to_value(
                    self.grant_permission(parent, &permission).await?,
                )?)
            }
            (Resource::Role, Resource::Permission, Method::Delete, Some(permission)) => {
                Ok(serde_json::to_value(
                    self.revoke_permission(parent, &permission).await?,
                )?)
            }
            (_, child, _, _) => Err(MockError::Unsupported(format!(
                "{} {}/{{id}}/{}",
                method.as_str(),
                resource.path(),
                child.path()
            ))),
        }
    }
}

#[async_trait]
impl Transport for MockDataProvider {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        Ok(self.handle(request).await?)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn remove_id(ids: &mut Vec<EntityId>, id: &EntityId) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}

fn require_body(body: Option<Value>) -> Result<Value, MockError> {
    body.ok_or_else(|| MockError::Validation("request body is required".into()))
}

fn unsupported(method: Method, resource: Resource, reason: &str) -> MockError {
    MockError::Unsupported(format!(
        "{} /{}: {reason}",
        method.as_str(),
        resource.path()
    ))
}
