//! Cached question store.

use std::sync::Arc;
use std::time::Duration;

use mango_core::cache::{Cache, QuestionKey};
use mango_core::document::{DocumentId, Filter, FindOptions, Status};
use mango_core::question::{NewQuestion, PartialQuestion, Question, QuestionCriteria};
use mango_core::storage::{DocumentCollection, Result, StoreError};

use super::DocumentStore;

/// Question persistence with a cached by-id view and a cached `ALL`
/// listing of every non-deleted question.
///
/// Every write invalidates the `ALL` listing.
pub struct QuestionStore<R = dyn DocumentCollection, C = dyn Cache>
where
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    store: DocumentStore<Question, R, C>,
}

impl<R, C> QuestionStore<R, C>
where
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    pub fn new(collection: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            store: DocumentStore::new(collection, cache, ttl),
        }
    }

    pub async fn save(&self, question: &NewQuestion) -> Result<DocumentId> {
        let id = self.store.save(question).await?;
        self.store.invalidate(&[QuestionKey::All]).await;
        Ok(id)
    }

    pub async fn get_question_by_id(&self, id: &str) -> Result<Question> {
        self.store.find_by_id(id, None).await
    }

    pub async fn get_question_by_id_with_status(&self, id: &str, status: Status) -> Result<Question> {
        self.store.find_by_id(id, Some(status)).await
    }

    /// Writes a full question and returns the modified count.
    pub async fn update(&self, id: &str, question: &Question) -> Result<u64> {
        let modified = self.store.update(id, question).await?;
        self.store.invalidate(&[QuestionKey::All]).await;
        Ok(modified)
    }

    /// Soft-deletes a question and returns the modified count.
    pub async fn delete(&self, id: &str) -> Result<u64> {
        let modified = self.store.delete(id).await?;
        self.store.invalidate(&[QuestionKey::All]).await;
        Ok(modified)
    }

    /// Every active or inactive question, in natural order.
    ///
    /// An empty listing is not cached.
    pub async fn get_questions(&self) -> Result<Vec<Question>> {
        if let Some(questions) = self.store.read_cache::<Vec<Question>>(&QuestionKey::All).await {
            return Ok(questions);
        }

        tracing::debug!("Reading question listing directly from database");
        let filter = Filter::new().is_in("status", Status::LISTED.iter().map(Status::as_str));
        let questions = self.store.find_many(&filter, &FindOptions::default()).await?;

        if !questions.is_empty() {
            self.store.write_cache(&QuestionKey::All, &questions).await;
        }
        Ok(questions)
    }

    /// Questions among `criteria.ids` that satisfy every filter, straight
    /// from the database.
    ///
    /// Ids that do not match are left out rather than reported.
    pub async fn get_questions_by_filters(
        &self,
        criteria: &QuestionCriteria,
    ) -> Result<Vec<PartialQuestion>> {
        self.store
            .find_by_filter(&criteria.filter(), &criteria.find_options())
            .await?
            .into_iter()
            .map(|raw| serde_json::from_value(raw).map_err(StoreError::from))
            .collect()
    }
}
