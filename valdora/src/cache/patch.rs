//! Pure data patches applied to cached payloads.
//!
//! Optimistic updates never capture closures over cache state. A [`Patch`] is
//! plain data; before it touches an entry the cache pairs it with the
//! [`Patch`] that undoes only its own change ([`PatchPair`]), so rolling back
//! is applying another patch and overlapping updates roll back independently.
//!
//! Patches understand the two payload shapes the data layer produces:
//!
//! - list envelopes `{items: [...], total, page, limit}` and bare arrays,
//! - single entity objects carrying an `id`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use valdora_core::EntityId;

/// A change to a cached payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replaces the whole payload.
    Replace(Value),
    /// Merges `fields` into the entity with `id`, in a list or as the payload.
    MergeItem {
        /// Entity to change.
        id: EntityId,
        /// Object whose fields overwrite the entity's.
        fields: Map<String, Value>,
    },
    /// Appends an entity to a list and bumps its `total`.
    InsertItem(Value),
    /// Drops the entity with `id` from a list and lowers its `total`.
    RemoveItem {
        /// Entity to drop.
        id: EntityId,
    },
    /// Writes fields of the entity with `id` back: `Some` values are set,
    /// `None` fields are removed.
    RestoreFields {
        /// Entity to change.
        id: EntityId,
        /// Field values to restore.
        fields: BTreeMap<String, Option<Value>>,
    },
    /// Puts entities back into a list at their former positions and raises
    /// its `total`.
    Reinsert {
        /// `(index, entity)` pairs in ascending index order.
        items: Vec<(usize, Value)>,
    },
}

impl Patch {
    /// Builds a [`Patch::MergeItem`] from a JSON object; other values merge nothing.
    pub fn merge(id: impl Into<EntityId>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        Patch::MergeItem {
            id: id.into(),
            fields,
        }
    }

    /// Builds a [`Patch::RemoveItem`].
    pub fn remove(id: impl Into<EntityId>) -> Self {
        Patch::RemoveItem { id: id.into() }
    }

    /// Applies the patch in place. Returns whether `data` changed shape or
    /// content; payloads the patch does not apply to are left untouched.
    ///
    /// ```
    /// use serde_json::json;
    /// use valdora::cache::Patch;
    ///
    /// let mut page = json!({"items": [{"id": "1", "status": "active"}], "total": 1});
    /// Patch::merge("1", json!({"status": "suspended"})).apply(&mut page);
    /// assert_eq!(page["items"][0]["status"], "suspended");
    ///
    /// Patch::remove("1").apply(&mut page);
    /// assert_eq!(page, json!({"items": [], "total": 0}));
    /// ```
    pub fn apply(&self, data: &mut Value) -> bool {
        match self {
            Patch::Replace(value) => {
                if data == value {
                    return false;
                }
                *data = value.clone();
                true
            }
            Patch::MergeItem { id, fields } => {
                if has_id(data, id) {
                    return merge_fields(data, fields);
                }
                let Some(items) = items_mut(data) else {
                    return false;
                };
                items
                    .iter_mut()
                    .filter(|item| has_id(item, id))
                    .fold(false, |changed, item| merge_fields(item, fields) || changed)
            }
            Patch::InsertItem(item) => {
                let Some(items) = items_mut(data) else {
                    return false;
                };
                items.push(item.clone());
                adjust_total(data, 1);
                true
            }
            Patch::RemoveItem { id } => {
                let Some(items) = items_mut(data) else {
                    return false;
                };
                let before = items.len();
                items.retain(|item| !has_id(item, id));
                let removed = before - items.len();
                if removed == 0 {
                    return false;
                }
                adjust_total(data, -(removed as i64));
                true
            }
            Patch::RestoreFields { id, fields } => {
                if has_id(data, id) {
                    return restore_fields(data, fields);
                }
                let Some(items) = items_mut(data) else {
                    return false;
                };
                items
                    .iter_mut()
                    .filter(|item| has_id(item, id))
                    .fold(false, |changed, item| restore_fields(item, fields) || changed)
            }
            Patch::Reinsert { items: removed } => {
                let Some(items) = items_mut(data) else {
                    return false;
                };
                if removed.is_empty() {
                    return false;
                }
                for (index, item) in removed {
                    let index = (*index).min(items.len());
                    items.insert(index, item.clone());
                }
                adjust_total(data, removed.len() as i64);
                true
            }
        }
    }

    /// The patch undoing `self` on `current`, the payload it is about to be
    /// applied to. Only what `self` changes is restored.
    fn inverse(&self, current: &Value) -> Patch {
        match self {
            Patch::MergeItem { id, fields } => Patch::RestoreFields {
                id: id.clone(),
                fields: previous_fields(current, id, fields.keys()),
            },
            Patch::RestoreFields { id, fields } => Patch::RestoreFields {
                id: id.clone(),
                fields: previous_fields(current, id, fields.keys()),
            },
            Patch::InsertItem(item) => match item.get("id").and_then(id_of) {
                Some(id) => Patch::RemoveItem { id },
                None => Patch::Replace(current.clone()),
            },
            Patch::RemoveItem { id } => Patch::Reinsert {
                items: list_items(current)
                    .map(|items| {
                        items
                            .iter()
                            .enumerate()
                            .filter(|(_, item)| has_id(item, id))
                            .map(|(index, item)| (index, item.clone()))
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            Patch::Replace(_) | Patch::Reinsert { .. } => Patch::Replace(current.clone()),
        }
    }
}

/// A patch together with the patch that restores the payload it was
/// computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPair {
    /// The change to apply.
    pub forward: Patch,
    /// Undoes `forward`, touching only what it changed.
    pub inverse: Patch,
}

impl PatchPair {
    /// Pairs `forward` with its inverse for the payload `current`.
    ///
    /// A merge is undone by writing the touched fields back, an insert by
    /// removing the entity, a removal by reinserting it at its former index.
    /// Changes made by other patches in between survive the rollback. Only
    /// `Replace` and inserts of entities without an `id` fall back to a
    /// snapshot of `current`.
    ///
    /// ```
    /// use serde_json::json;
    /// use valdora::cache::{Patch, PatchPair};
    ///
    /// let mut page = json!({"items": [{"id": "1"}, {"id": "2"}], "total": 2});
    /// let pair = PatchPair::prepare(Patch::remove("1"), &page);
    /// pair.forward.apply(&mut page);
    /// Patch::merge("2", json!({"status": "suspended"})).apply(&mut page);
    /// pair.inverse.apply(&mut page);
    /// assert_eq!(
    ///     page,
    ///     json!({"items": [{"id": "1"}, {"id": "2", "status": "suspended"}], "total": 2}),
    /// );
    /// ```
    pub fn prepare(forward: Patch, current: &Value) -> Self {
        let inverse = forward.inverse(current);
        Self { forward, inverse }
    }
}

fn list_items(data: &Value) -> Option<&Vec<Value>> {
    match data {
        Value::Array(items) => Some(items),
        Value::Object(object) => object.get("items").and_then(Value::as_array),
        _ => None,
    }
}

fn previous_fields<'a>(
    current: &Value,
    id: &EntityId,
    names: impl Iterator<Item = &'a String>,
) -> BTreeMap<String, Option<Value>> {
    let target = if has_id(current, id) {
        Some(current)
    } else {
        list_items(current).and_then(|items| items.iter().find(|item| has_id(item, id)))
    };
    let Some(object) = target.and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    names
        .filter(|name| name.as_str() != "id")
        .map(|name| (name.clone(), object.get(name).cloned()))
        .collect()
}

fn id_of(value: &Value) -> Option<EntityId> {
    match value {
        Value::String(s) => Some(EntityId::new(s.as_str())),
        Value::Number(n) => Some(EntityId::new(n.to_string())),
        _ => None,
    }
}

fn restore_fields(target: &mut Value, fields: &BTreeMap<String, Option<Value>>) -> bool {
    let Some(object) = target.as_object_mut() else {
        return false;
    };
    let mut changed = false;
    for (name, value) in fields {
        match value {
            Some(value) if object.get(name) != Some(value) => {
                object.insert(name.clone(), value.clone());
                changed = true;
            }
            None => changed |= object.remove(name).is_some(),
            Some(_) => {}
        }
    }
    changed
}

fn items_mut(data: &mut Value) -> Option<&mut Vec<Value>> {
    match data {
        Value::Array(items) => Some(items),
        Value::Object(object) => object.get_mut("items").and_then(Value::as_array_mut),
        _ => None,
    }
}

fn has_id(value: &Value, id: &EntityId) -> bool {
    match value.get("id") {
        Some(Value::String(s)) => s == id.as_str(),
        Some(Value::Number(n)) => n.to_string() == id.as_str(),
        _ => false,
    }
}

fn merge_fields(target: &mut Value, fields: &Map<String, Value>) -> bool {
    let Some(object) = target.as_object_mut() else {
        return false;
    };
    let mut changed = false;
    for (name, value) in fields {
        if name == "id" {
            continue;
        }
        if object.get(name) != Some(value) {
            object.insert(name.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

fn adjust_total(data: &mut Value, delta: i64) {
    if let Some(total) = data.get_mut("total")
        && let Some(current) = total.as_i64()
    {
        *total = Value::from((current + delta).max(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn page() -> Value {
        json!({
            "items": [
                {"id": "1", "name": "Acme Corporation", "status": "active"},
                {"id": "2", "name": "TechStart Solutions", "status": "active"},
            ],
            "total": 2,
            "page": 1,
            "limit": 10,
        })
    }

    #[test]
    fn test_merge_into_list_item() {
        let mut data = page();
        assert!(Patch::merge("2", json!({"status": "suspended"})).apply(&mut data));
        assert_eq!(data["items"][1]["status"], "suspended");
        assert_eq!(data["items"][0]["status"], "active");
        assert_eq!(data["total"], 2);
    }

    #[test]
    fn test_merge_into_single_entity_keeps_id() {
        let mut data = json!({"id": 7, "name": "Old"});
        let patch = Patch::merge("7", json!({"id": "99", "name": "New"}));
        assert!(patch.apply(&mut data));
        assert_eq!(data, json!({"id": 7, "name": "New"}));
        assert!(!patch.apply(&mut data));
    }

    #[test]
    fn test_insert_and_remove_adjust_total() {
        let mut data = page();
        assert!(Patch::InsertItem(json!({"id": "3"})).apply(&mut data));
        assert_eq!(data["total"], 3);
        assert!(Patch::remove("1").apply(&mut data));
        assert_eq!(data["total"], 2);
        assert_eq!(data["items"][0]["id"], "2");
        assert!(!Patch::remove("unknown").apply(&mut data));
    }

    #[test]
    fn test_bare_array_lists() {
        let mut data = json!([{"id": "1"}, {"id": "2"}]);
        assert!(Patch::remove("1").apply(&mut data));
        assert_eq!(data, json!([{"id": "2"}]));
    }

    #[test]
    fn test_non_list_payload_untouched() {
        let mut data = json!({"tenants": {"total": 4}});
        assert!(!Patch::InsertItem(json!({"id": "1"})).apply(&mut data));
        assert!(!Patch::remove("1").apply(&mut data));
        assert_eq!(data, json!({"tenants": {"total": 4}}));
    }

    #[test]
    fn test_overlapping_merges_roll_back_independently() {
        let mut data = page();
        let first = PatchPair::prepare(Patch::merge("1", json!({"status": "suspended"})), &data);
        first.forward.apply(&mut data);
        let second = PatchPair::prepare(Patch::merge("2", json!({"status": "suspended"})), &data);
        second.forward.apply(&mut data);

        assert!(first.inverse.apply(&mut data));
        assert_eq!(data["items"][0]["status"], "active");
        assert_eq!(data["items"][1]["status"], "suspended");

        assert!(second.inverse.apply(&mut data));
        assert_eq!(data, page());
    }

    #[test]
    fn test_merge_inverse_removes_added_fields() {
        let mut data = page();
        let pair = PatchPair::prepare(Patch::merge("2", json!({"note": "vip"})), &data);
        pair.forward.apply(&mut data);
        assert_eq!(data["items"][1]["note"], "vip");
        pair.inverse.apply(&mut data);
        assert_eq!(data, page());
    }

    #[test]
    fn test_insert_inverse_removes_only_the_inserted_item() {
        let mut data = page();
        let pair = PatchPair::prepare(Patch::InsertItem(json!({"id": "3"})), &data);
        assert_eq!(pair.inverse, Patch::remove("3"));
        pair.forward.apply(&mut data);
        Patch::merge("1", json!({"status": "inactive"})).apply(&mut data);
        pair.inverse.apply(&mut data);
        assert_eq!(data["total"], 2);
        assert_eq!(data["items"][0]["status"], "inactive");
    }

    #[test]
    fn test_remove_inverse_reinserts_at_index() {
        let mut data = page();
        let pair = PatchPair::prepare(Patch::remove("1"), &data);
        pair.forward.apply(&mut data);
        Patch::InsertItem(json!({"id": "3"})).apply(&mut data);
        pair.inverse.apply(&mut data);
        let ids: Vec<_> = data["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
        assert_eq!(data["total"], 3);
    }

    #[test]
    fn test_inverse_restores_exactly() {
        let original = page();
        let pair = PatchPair::prepare(Patch::remove("1"), &original);
        let mut data = original.clone();
        pair.forward.apply(&mut data);
        pair.inverse.apply(&mut data);
        assert_eq!(data, original);
    }
}
