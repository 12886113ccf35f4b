use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{DocumentId, Status};
use crate::cache::CacheKey;

/// Fields only the store may write. Client payloads never carry them.
pub const STORE_MANAGED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// An entity persisted through a cached document store.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key type of the entity's cache namespace.
    type Key: CacheKey;

    /// Entity name used in `DocumentNotFound` errors and logs.
    const ENTITY: &'static str;

    /// Timestamp fields set to "now" when a document is created.
    const CREATED_FIELDS: &'static [&'static str] = &["created_at"];

    /// Timestamp fields refreshed on every update.
    const UPDATED_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> DocumentId;

    /// Lifecycle status, for soft-deletable entities.
    fn lifecycle_status(&self) -> Option<Status> {
        None
    }

    /// Cache key of a by-id lookup, qualified by status when the entity
    /// tracks per-status entries.
    fn id_key(id: DocumentId, status: Option<Status>) -> Self::Key;

    /// Every key that may hold a copy of the document with this id.
    fn id_keys(id: DocumentId) -> Vec<Self::Key> {
        vec![Self::id_key(id, None)]
    }
}

/// Canonical timestamp rendering. Fixed width, so stored timestamps sort
/// lexicographically in every backend.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Strips nulls and store-managed fields from a client payload.
///
/// Returns `None` when nothing savable is left, including when the payload
/// is not a JSON object at all.
///
/// # Examples
///
/// ```
/// use mango_core::document::normalize_payload;
/// use serde_json::json;
///
/// let doc = normalize_payload(json!({"id": "x", "weight": 2, "category": null})).unwrap();
/// assert_eq!(doc.len(), 1);
/// assert!(normalize_payload(json!({"created_at": "2024-01-01"})).is_none());
/// ```
pub fn normalize_payload(payload: Value) -> Option<Map<String, Value>> {
    let Value::Object(fields) = payload else {
        return None;
    };
    let cleaned: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, value)| !value.is_null() && !STORE_MANAGED_FIELDS.contains(&key.as_str()))
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Sets every creation timestamp field of `D` on a normalized payload.
pub fn stamp<D: Document>(doc: &mut Map<String, Value>, now: DateTime<Utc>) {
    stamp_fields(doc, D::CREATED_FIELDS, now);
}

/// Sets every update timestamp field of `D` on an update's field set.
pub fn stamp_update<D: Document>(set: &mut Map<String, Value>, now: DateTime<Utc>) {
    stamp_fields(set, D::UPDATED_FIELDS, now);
}

fn stamp_fields(doc: &mut Map<String, Value>, fields: &[&str], now: DateTime<Utc>) {
    let rendered = format_timestamp(now);
    for field in fields {
        doc.insert((*field).to_string(), Value::String(rendered.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_normalize_drops_nulls_and_managed_fields() {
        let doc = normalize_payload(json!({
            "id": "client-chosen",
            "created_at": "2020-01-01T00:00:00Z",
            "updated_at": "2020-01-01T00:00:00Z",
            "staff_id": null,
            "user_id": "u-1"
        }))
        .unwrap();

        assert_eq!(Value::Object(doc), json!({"user_id": "u-1"}));
    }

    #[test]
    fn test_normalize_keeps_falsy_values() {
        let doc = normalize_payload(json!({"weight": 0, "include_in": [], "content": ""})).unwrap();
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_normalize_empty_payloads() {
        assert!(normalize_payload(json!({})).is_none());
        assert!(normalize_payload(json!({"status": null})).is_none());
        assert!(normalize_payload(json!([1, 2])).is_none());
        assert!(normalize_payload(Value::Null).is_none());
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(whole), "2024-01-01T12:00:00.000000Z");
        let later = whole + chrono::Duration::milliseconds(5);
        assert!(format_timestamp(whole) < format_timestamp(later));
    }

    #[test]
    fn test_stamp_sets_entity_timestamp_fields() {
        use crate::question::Question;
        use crate::survey::Survey;

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();

        let mut question = Map::new();
        stamp::<Question>(&mut question, now);
        assert_eq!(question.len(), 1);
        assert_eq!(question["created_at"], json!("2024-03-01T08:30:00.000000Z"));

        let mut survey = Map::new();
        stamp::<Survey>(&mut survey, now);
        assert_eq!(survey["created_at"], survey["updated_at"]);

        let mut set = Map::new();
        stamp_update::<Question>(&mut set, now);
        assert!(set.is_empty());
        stamp_update::<Survey>(&mut set, now);
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("updated_at"));
    }
}
