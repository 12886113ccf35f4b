use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use mango_core::document::{DocumentId, Filter, FindOptions, Projection, ID_FIELD};
use mango_core::storage::{apply_set, DocumentCollection, DocumentStream, Result, UpdateResult};

/// A named in-memory document collection.
#[derive(Debug, Clone)]
pub struct InMemoryCollection {
    name: String,
    docs: Arc<RwLock<Vec<Value>>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of stored documents, regardless of status.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn project(doc: &Value, projection: Option<&Projection>) -> Value {
    match projection {
        Some(projection) => projection.apply(doc),
        None => doc.clone(),
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, mut doc: Map<String, Value>) -> Result<DocumentId> {
        let id = DocumentId::new();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        self.docs.write().await.push(Value::Object(doc));
        Ok(id)
    }

    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Value>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|doc| filter.matches(doc))
            .map(|doc| project(doc, projection)))
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>> {
        let docs = self.docs.read().await;
        let mut matching: Vec<&Value> = docs.iter().filter(|doc| filter.matches(doc)).collect();
        if let Some(sort) = &options.sort {
            // Stable: ties keep insertion order.
            matching.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(doc, options.projection.as_ref()))
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn update_one(&self, filter: &Filter, set: Map<String, Value>) -> Result<UpdateResult> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc)) else {
            return Ok(UpdateResult::default());
        };
        let modified = apply_set(doc, &set);
        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    fn stream(&self, filter: Filter) -> DocumentStream {
        let docs = Arc::clone(&self.docs);
        Box::pin(async_stream::stream! {
            let mut position = 0;
            loop {
                // Re-lock per item so writers are never starved by a slow consumer.
                let next = {
                    let docs = docs.read().await;
                    docs.iter()
                        .enumerate()
                        .skip(position)
                        .find(|(_, doc)| filter.matches(doc))
                        .map(|(index, doc)| (index, doc.clone()))
                };
                match next {
                    Some((index, doc)) => {
                        position = index + 1;
                        yield Ok(doc);
                    }
                    None => break,
                }
            }
        })
    }
}
