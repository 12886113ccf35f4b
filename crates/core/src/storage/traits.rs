use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_stream::Stream;

use super::Result;
use crate::document::{DocumentId, Filter, FindOptions, Projection};

/// Lazy, forward-only sequence of raw documents.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// Outcome of an `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents the filter selected (0 or 1).
    pub matched: u64,
    /// Documents whose stored body actually changed.
    pub modified: u64,
}

/// A collection of JSON documents keyed by an `id` field.
///
/// Every call is a single atomic document operation; implementations do
/// not coordinate with any cache.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Assigns a fresh id, stores the document and returns the id.
    /// Any `id` field already present in `doc` is replaced.
    async fn insert_one(&self, doc: Map<String, Value>) -> Result<DocumentId>;

    /// First document matching the filter in natural order.
    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Value>>;

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>>;

    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Sets top-level fields on the first matching document.
    async fn update_one(&self, filter: &Filter, set: Map<String, Value>) -> Result<UpdateResult>;

    /// Streams matching documents in natural order without materializing
    /// the whole result.
    fn stream(&self, filter: Filter) -> DocumentStream;
}

/// Applies `$set` semantics to a stored body, returning whether anything
/// changed.
///
/// # Examples
///
/// ```
/// use mango_core::storage::apply_set;
/// use serde_json::{json, Map};
///
/// let mut doc = json!({"id": "a", "status": "active"});
/// let mut set = Map::new();
/// set.insert("status".into(), json!("active"));
/// assert!(!apply_set(&mut doc, &set));
/// set.insert("status".into(), json!("deleted"));
/// assert!(apply_set(&mut doc, &set));
/// ```
pub fn apply_set(doc: &mut Value, set: &Map<String, Value>) -> bool {
    let Value::Object(fields) = doc else {
        return false;
    };
    let mut changed = false;
    for (field, value) in set {
        if fields.get(field) != Some(value) {
            fields.insert(field.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_set_adds_missing_fields() {
        let mut doc = json!({"id": "a"});
        let mut set = Map::new();
        set.insert("weight".into(), json!(2));

        assert!(apply_set(&mut doc, &set));
        assert_eq!(doc, json!({"id": "a", "weight": 2}));
    }

    #[test]
    fn test_apply_set_identical_values_is_noop() {
        let mut doc = json!({"id": "a", "order": 1, "title": {"on_rate": "x"}});
        let mut set = Map::new();
        set.insert("order".into(), json!(1));
        set.insert("title".into(), json!({"on_rate": "x"}));

        assert!(!apply_set(&mut doc, &set));
    }

    #[test]
    fn test_apply_set_on_non_object() {
        let mut doc = json!([1, 2]);
        assert!(!apply_set(&mut doc, &Map::new()));
    }
}
