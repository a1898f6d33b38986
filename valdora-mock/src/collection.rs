//! Generic in-memory entity collection.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use valdora_core::{EntityId, ListParams, Page};

use crate::entity::Entity;
use crate::error::MockError;

/// Fields owned by the collection, never taken from a caller payload.
const MANAGED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Entities of one resource type behind an async lock.
///
/// Identifiers come from a monotonic counter that starts above the highest
/// numeric id of the initial items, so an id is never handed out twice, even
/// after the entity that held it was deleted.
#[derive(Debug)]
pub struct Collection<E> {
    items: RwLock<Vec<E>>,
    next_id: AtomicU64,
}

impl<E: Entity> Default for Collection<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E: Entity> Collection<E> {
    /// Creates a collection holding `items`.
    pub fn new(items: Vec<E>) -> Self {
        let highest = items
            .iter()
            .filter_map(|item| item.id().as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            items: RwLock::new(items),
            next_id: AtomicU64::new(highest + 1),
        }
    }

    /// Filters by status, then by search term, then paginates.
    ///
    /// `total` counts the filtered items before pagination.
    pub async fn list(&self, params: &ListParams) -> Page<E> {
        let items = self.items.read().await;
        let status = params.status.as_deref().filter(|s| !s.is_empty());
        let needle = params
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let filtered: Vec<&E> = items
            .iter()
            .filter(|item| status.is_none_or(|status| item.status() == Some(status)))
            .filter(|item| needle.as_deref().is_none_or(|needle| item.matches(needle)))
            .collect();

        let page = params.effective_page();
        let limit = params.effective_limit();
        let start = (page as usize - 1).saturating_mul(limit as usize);

        Page {
            items: filtered
                .iter()
                .skip(start)
                .take(limit as usize)
                .map(|item| (*item).clone())
                .collect(),
            total: filtered.len(),
            page,
            limit,
        }
    }

    /// Returns the entity with `id`.
    pub async fn get(&self, id: &EntityId) -> Result<E, MockError> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| MockError::not_found(E::RESOURCE, id))
    }

    /// Whether an entity with `id` exists.
    pub async fn contains(&self, id: &EntityId) -> bool {
        self.items.read().await.iter().any(|item| item.id() == id)
    }

    /// Creates an entity from `payload` merged over the resource defaults.
    ///
    /// The new entity gets a fresh id and `createdAt == updatedAt == now`.
    pub async fn create(&self, payload: Value, now: DateTime<Utc>) -> Result<E, MockError> {
        let mut fields = E::defaults();
        merge(&mut fields, payload)?;

        let id = EntityId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timestamp = serde_json::to_value(now)?;
        fields.insert("id".into(), Value::String(id.to_string()));
        fields.insert("createdAt".into(), timestamp.clone());
        fields.insert("updatedAt".into(), timestamp);

        let entity: E = serde_json::from_value(Value::Object(fields))?;
        entity.validate()?;

        self.items.write().await.push(entity.clone());
        debug!(resource = E::RESOURCE.as_str(), %id, "mock entity created");
        Ok(entity)
    }

    /// Merges `patch` over the entity with `id` and refreshes `updatedAt`.
    ///
    /// On validation failure the stored entity is left untouched. Fields `E`
    /// does not model are dropped.
    pub async fn update(
        &self,
        id: &EntityId,
        patch: Value,
        now: DateTime<Utc>,
    ) -> Result<E, MockError> {
        let mut items = self.items.write().await;
        let slot = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| MockError::not_found(E::RESOURCE, id))?;

        let mut fields = match serde_json::to_value(&*slot)? {
            Value::Object(fields) => fields,
            other => {
                return Err(MockError::Validation(format!(
                    "stored entity is not an object: {other}"
                )));
            }
        };
        merge(&mut fields, patch)?;
        fields.insert("updatedAt".into(), serde_json::to_value(now)?);

        let updated: E = serde_json::from_value(Value::Object(fields))?;
        updated.validate()?;
        *slot = updated.clone();
        debug!(resource = E::RESOURCE.as_str(), %id, "mock entity updated");
        Ok(updated)
    }

    /// Removes the entity with `id`.
    pub async fn delete(&self, id: &EntityId) -> Result<E, MockError> {
        let mut items = self.items.write().await;
        let position = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| MockError::not_found(E::RESOURCE, id))?;
        let removed = items.remove(position);
        debug!(resource = E::RESOURCE.as_str(), %id, "mock entity deleted");
        Ok(removed)
    }

    /// Applies `change` to the entity with `id`; refreshes `updatedAt` when it
    /// reports a modification.
    pub(crate) async fn modify<F>(
        &self,
        id: &EntityId,
        now: DateTime<Utc>,
        change: F,
    ) -> Result<E, MockError>
    where
        F: FnOnce(&mut E) -> bool + Send,
    {
        let mut items = self.items.write().await;
        let slot = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| MockError::not_found(E::RESOURCE, id))?;
        if change(slot) {
            slot.touch(now);
        }
        Ok(slot.clone())
    }

    /// Copy of every entity, in insertion order.
    pub async fn all(&self) -> Vec<E> {
        self.items.read().await.clone()
    }

    /// Number of entities.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the collection holds no entity.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

fn merge(fields: &mut Map<String, Value>, payload: Value) -> Result<(), MockError> {
    let Value::Object(payload) = payload else {
        return Err(MockError::Validation("payload must be a JSON object".into()));
    };
    for (key, value) in payload {
        if !MANAGED_FIELDS.contains(&key.as_str()) {
            fields.insert(key, value);
        }
    }
    Ok(())
}

/// Object-safe view of a [`Collection`] speaking JSON, used to dispatch on
/// [`Resource`](valdora_core::Resource) at runtime.
#[async_trait]
pub(crate) trait JsonCollection: Send + Sync {
    async fn list_json(&self, params: &ListParams) -> Result<Page<Value>, MockError>;
    async fn get_json(&self, id: &EntityId) -> Result<Value, MockError>;
    async fn create_json(&self, payload: Value, now: DateTime<Utc>) -> Result<Value, MockError>;
    async fn update_json(
        &self,
        id: &EntityId,
        patch: Value,
        now: DateTime<Utc>,
    ) -> Result<Value, MockError>;
    async fn delete_json(&self, id: &EntityId) -> Result<(), MockError>;
}

#[async_trait]
impl<E: Entity> JsonCollection for Collection<E> {
    async fn list_json(&self, params: &ListParams) -> Result<Page<Value>, MockError> {
        let page = self.list(params).await;
        let items = page
            .items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total: page.total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_json(&self, id: &EntityId) -> Result<Value, MockError> {
        Ok(serde_json::to_value(self.get(id).await?)?)
    }

    async fn create_json(&self, payload: Value, now: DateTime<Utc>) -> Result<Value, MockError> {
        Ok(serde_json::to_value(self.create(payload, now).await?)?)
    }

    async fn update_json(
        &self,
        id: &EntityId,
        patch: Value,
        now: DateTime<Utc>,
    ) -> Result<Value, MockError> {
        Ok(serde_json::to_value(self.update(id, patch, now).await?)?)
    }

    async fn delete_json(&self, id: &EntityId) -> Result<(), MockError> {
        self.delete(id).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Role;
    use serde_json::json;

    fn role(id: &str, name: &str) -> Role {
        Role {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            permission_ids: Vec::new(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    #[tokio::test]
    async fn test_ids_start_above_highest_seed() {
        let roles = Collection::new(vec![role("3", "Viewer"), role("legacy", "Old")]);
        let created = roles
            .create(json!({"name": "Auditor"}), Utc::now())
            .await
            .unwrap();
        assert_eq!(created.id.as_str(), "4");
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let roles: Collection<Role> = Collection::default();
        let first = roles.create(json!({"name": "A"}), Utc::now()).await.unwrap();
        roles.delete(&first.id).await.unwrap();
        let second = roles.create(json!({"name": "B"}), Utc::now()).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_managed_fields_ignored_in_payload() {
        let roles = Collection::new(vec![role("1", "Admin")]);
        let now = Utc::now();
        let created = roles
            .create(
                json!({"id": "1", "name": "Support", "createdAt": "2000-01-01T00:00:00Z"}),
                now,
            )
            .await
            .unwrap();
        assert_eq!(created.id.as_str(), "2");
        assert_eq!(created.created_at, now);
        assert_eq!(roles.len().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_update_keeps_entity() {
        let roles = Collection::new(vec![role("1", "Admin")]);
        let result = roles.update(&"1".into(), json!({"name": ""}), Utc::now()).await;
        assert!(matches!(result, Err(MockError::Validation(_))));
        assert_eq!(roles.get(&"1".into()).await.unwrap().name, "Admin");
    }

    #[tokio::test]
    async fn test_update_drops_unmodeled_fields() {
        let roles = Collection::new(vec![role("1", "Admin")]);
        let updated = roles
            .update_json(&"1".into(), json!({"name": "Owner", "color": "red"}), Utc::now())
            .await
            .unwrap();
        assert_eq!(updated["name"], "Owner");
        assert!(updated.get("color").is_none());
        assert_eq!(roles.get(&"1".into()).await.unwrap().name, "Owner");
    }

    #[tokio::test]
    async fn test_non_object_payload_rejected() {
        let roles: Collection<Role> = Collection::default();
        let result = roles.create(json!(["name"]), Utc::now()).await;
        assert!(matches!(result, Err(MockError::Validation(_))));
        assert!(roles.is_empty().await);
    }
}
