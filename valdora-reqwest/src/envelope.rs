//! Adaptation between network list envelopes and the logical list shape.
//!
//! The dashboard consumes `{items, total, page, limit}`. Backends built on
//! API Platform answer with a Hydra collection instead:
//!
//! ```json
//! { "hydra:member": [ ... ], "hydra:totalItems": 42 }
//! ```
//!
//! Some deployments drop the `hydra:` prefix, and some endpoints return a
//! bare array. All three are rewritten here so the mock and real paths hand
//! the cache the same shape.

use serde_json::{Value, json};
use valdora_core::ListParams;

const MEMBER_KEYS: [&str; 2] = ["hydra:member", "member"];
const TOTAL_KEYS: [&str; 2] = ["hydra:totalItems", "totalItems"];

/// Rewrites a list response body into `{items, total, page, limit}`.
///
/// Bodies already in the logical shape, and bodies that are not lists at all,
/// are returned unchanged.
///
/// ```
/// use serde_json::json;
/// use valdora_core::ListParams;
/// use valdora_reqwest::normalize_list;
///
/// let hydra = json!({"member": [{"id": "1"}], "totalItems": 12});
/// assert_eq!(
///     normalize_list(hydra, &ListParams::new().page(2).limit(5)),
///     json!({"items": [{"id": "1"}], "total": 12, "page": 2, "limit": 5}),
/// );
/// ```
pub fn normalize_list(body: Value, params: &ListParams) -> Value {
    match body {
        Value::Array(items) => {
            let total = items.len();
            page(items, total, params)
        }
        Value::Object(mut object) => {
            let member_key = MEMBER_KEYS
                .into_iter()
                .find(|key| object.get(*key).is_some_and(Value::is_array));
            let Some(Value::Array(items)) = member_key.and_then(|key| object.remove(key)) else {
                return Value::Object(object);
            };
            let total = TOTAL_KEYS
                .into_iter()
                .find_map(|key| object.get(key).and_then(Value::as_u64))
                .map_or(items.len(), |total| total as usize);
            page(items, total, params)
        }
        other => other,
    }
}

fn page(items: Vec<Value>, total: usize, params: &ListParams) -> Value {
    json!({
        "items": items,
        "total": total,
        "page": params.effective_page(),
        "limit": params.effective_limit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_hydra_collection() {
        let body = json!({
            "@context": "/contexts/Tenant",
            "hydra:member": [{"id": "1"}, {"id": "2"}],
            "hydra:totalItems": 2,
        });
        let normalized = normalize_list(body, &ListParams::new());
        assert_eq!(
            normalized,
            json!({"items": [{"id": "1"}, {"id": "2"}], "total": 2, "page": 1, "limit": 10})
        );
    }

    #[test]
    fn test_missing_total_counts_members() {
        let normalized = normalize_list(json!({"member": [{}, {}, {}]}), &ListParams::new());
        assert_eq!(normalized["total"], 3);
    }

    #[test]
    fn test_bare_array_is_wrapped() {
        let normalized = normalize_list(json!([{"id": "9"}]), &ListParams::new().limit(50));
        assert_eq!(normalized["items"], json!([{"id": "9"}]));
        assert_eq!(normalized["limit"], 50);
    }

    #[test]
    fn test_logical_shape_untouched() {
        let body = json!({"items": [], "total": 0, "page": 1, "limit": 10});
        assert_eq!(normalize_list(body.clone(), &ListParams::new()), body);
    }

    #[test]
    fn test_non_array_member_untouched() {
        let body = json!({"member": "nope", "totalItems": 1});
        assert_eq!(normalize_list(body.clone(), &ListParams::new()), body);
    }
}
