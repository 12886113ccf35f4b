//! Cached survey store.

use std::sync::Arc;
use std::time::Duration;

use mango_core::cache::{Cache, SurveyKey};
use mango_core::document::{DocumentId, Filter, FindOptions, SortKey};
use mango_core::storage::{DocumentCollection, Result, StoreError};
use mango_core::survey::{NewSurvey, Survey, SurveyPage, SurveyQuery};

use super::{DocumentStore, TypedStream};

/// Survey persistence with cached by-id, by-reservation and paginated
/// listing views.
///
/// A listing page is cached as two entries (items and total) under the
/// fingerprint of its normalized query. Every save purges all of them.
pub struct SurveyStore<R = dyn DocumentCollection, C = dyn Cache>
where
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    store: DocumentStore<Survey, R, C>,
}

impl<R, C> SurveyStore<R, C>
where
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    pub fn new(collection: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            store: DocumentStore::new(collection, cache, ttl),
        }
    }

    pub async fn save(&self, survey: &NewSurvey) -> Result<DocumentId> {
        let id = self.store.save(survey).await?;

        self.store.invalidate_pattern(&SurveyKey::pages_pattern()).await;
        self.store
            .invalidate(&[SurveyKey::ReservationId(survey.reservation_id.clone())])
            .await;

        tracing::debug!(survey_id = %id, reservation_id = %survey.reservation_id, "Survey saved");
        Ok(id)
    }

    pub async fn get_survey_by_id(&self, id: &str) -> Result<Survey> {
        self.store.find_by_id(id, None).await
    }

    /// The most recently created survey for a reservation.
    pub async fn get_by_reservation_id(&self, reservation_id: &str) -> Result<Survey> {
        let key = SurveyKey::ReservationId(reservation_id.to_string());
        if let Some(survey) = self.store.read_cache::<Survey>(&key).await {
            return Ok(survey);
        }

        tracing::debug!(reservation_id, "Reading survey directly from database");
        let filter = Filter::new().eq("reservation_id", reservation_id);
        let options = FindOptions::default()
            .with_sort(SortKey::descending("created_at"))
            .with_limit(1);
        let survey = self
            .store
            .find_many(&filter, &options)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found("Survey", reservation_id))?;

        self.store.write_cache(&key, &survey).await;
        Ok(survey)
    }

    /// One page of surveys plus the total number of matches.
    ///
    /// # Errors
    ///
    /// `InvalidFilter` when the sort key is malformed or names an unknown
    /// field.
    pub async fn get_surveys(&self, query: SurveyQuery) -> Result<SurveyPage> {
        let query = query.normalize()?;
        let fingerprint = query.fingerprint();
        let items_key = SurveyKey::PageItems(fingerprint.clone());
        let count_key = SurveyKey::PageCount(fingerprint);

        let cached_items = self.store.read_cache::<Vec<Survey>>(&items_key).await;
        let cached_total = self.store.read_cache::<u64>(&count_key).await;
        if let (Some(surveys), Some(total)) = (cached_items, cached_total) {
            return Ok(SurveyPage { surveys, total });
        }

        tracing::debug!(signature = %query.signature(), "Reading survey page directly from database");
        let filter = query.to_filter();
        let surveys = self.store.find_many(&filter, &query.find_options()).await?;
        let total = self.store.count(&filter).await?;

        self.store.write_cache(&items_key, &surveys).await;
        self.store.write_cache(&count_key, &total).await;

        Ok(SurveyPage { surveys, total })
    }

    /// Every survey in natural storage order, straight from the database.
    pub fn stream_surveys(&self) -> TypedStream<Survey> {
        self.store.stream(Filter::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockCache, MockCollection};
    use mango_core::cache::CacheKey;
    use mango_core::document::Status;
    use mango_core::survey::{SurveyFilter, SurveyQuestion};
    use tokio_stream::StreamExt;

    fn store() -> (
        SurveyStore<MockCollection, MockCache>,
        Arc<MockCollection>,
        Arc<MockCache>,
    ) {
        let collection = Arc::new(MockCollection::new("surveys"));
        let cache = Arc::new(MockCache::new());
        let store = SurveyStore::new(
            Arc::clone(&collection),
            Arc::clone(&cache),
            Duration::from_secs(60),
        );
        (store, collection, cache)
    }

    fn survey(reservation_id: &str, platform: &str) -> NewSurvey {
        NewSurvey {
            user_id: "user-1".to_string(),
            staff_id: None,
            reservation_id: reservation_id.to_string(),
            status: Status::Active,
            content: "Great".to_string(),
            platform: platform.to_string(),
            questions: vec![SurveyQuestion {
                question_id: DocumentId::new(),
                rating: 4,
            }],
            total_rating: Some(4.0),
        }
    }

    #[tokio::test]
    async fn test_save_sets_both_timestamps() {
        let (store, collection, _) = store();

        let id = store.save(&survey("R-1", "ios")).await.unwrap();

        let raw = collection.raw(id).await.unwrap();
        assert_eq!(raw["created_at"], raw["updated_at"]);
        let stored = store.get_survey_by_id(&id.to_string()).await.unwrap();
        assert_eq!(stored.total_rating, Some(4.0));
        assert_eq!(stored.staff_id, None);
    }

    #[tokio::test]
    async fn test_get_surveys_second_call_served_from_cache() {
        let (store, collection, cache) = store();
        store.save(&survey("R-1", "ios")).await.unwrap();
        store.save(&survey("R-2", "web")).await.unwrap();

        let first = store.get_surveys(SurveyQuery::default()).await.unwrap();
        let reads = collection.read_count();
        let second = store.get_surveys(SurveyQuery::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.total, 2);
        assert_eq!(collection.read_count(), reads);
        assert_eq!(cache.hit_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_is_cached() {
        let (store, collection, _) = store();
        let query = SurveyQuery {
            filter: SurveyFilter {
                platform: Some("android".to_string()),
                ..SurveyFilter::default()
            },
            ..SurveyQuery::default()
        };

        let first = store.get_surveys(query.clone()).await.unwrap();
        let reads = collection.read_count();
        let second = store.get_surveys(query).await.unwrap();

        assert!(first.surveys.is_empty());
        assert_eq!(second.total, 0);
        assert_eq!(collection.read_count(), reads);
    }

    #[tokio::test]
    async fn test_save_purges_every_page() {
        let (store, _, cache) = store();
        store.save(&survey("R-1", "ios")).await.unwrap();
        store.get_surveys(SurveyQuery::default()).await.unwrap();
        store
            .get_surveys(SurveyQuery {
                limit: Some(1),
                ..SurveyQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(cache.keys().await.len(), 4);

        store.save(&survey("R-2", "ios")).await.unwrap();

        assert!(cache.keys().await.is_empty());
        let page = store.get_surveys(SurveyQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_get_surveys_applies_sort_and_paging() {
        let (store, _, _) = store();
        let first = store.save(&survey("R-1", "ios")).await.unwrap();
        let second = store.save(&survey("R-2", "ios")).await.unwrap();
        let third = store.save(&survey("R-3", "ios")).await.unwrap();

        let page = store
            .get_surveys(SurveyQuery {
                skip: Some(1),
                limit: Some(1),
                sort: Some("+reservation_id".to_string()),
                ..SurveyQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.surveys.len(), 1);
        assert_eq!(page.surveys[0].id, second);
        assert_ne!(page.surveys[0].id, first);
        assert_ne!(page.surveys[0].id, third);
    }

    #[tokio::test]
    async fn test_get_surveys_rejects_bad_sort() {
        let (store, collection, _) = store();

        let err = store
            .get_surveys(SurveyQuery {
                sort: Some("created_at".to_string()),
                ..SurveyQuery::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidFilter(_)));
        assert_eq!(collection.read_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_reservation_id_caches_and_reports_missing() {
        let (store, collection, cache) = store();
        let id = store.save(&survey("R-9", "ios")).await.unwrap();

        let found = store.get_by_reservation_id("R-9").await.unwrap();
        store.get_by_reservation_id("R-9").await.unwrap();
        let missing = store.get_by_reservation_id("R-404").await;

        assert_eq!(found.id, id);
        assert_eq!(collection.read_count(), 2);
        assert!(
            cache
                .contains(&SurveyKey::ReservationId("R-9".to_string()).render())
                .await
        );
        assert_eq!(missing.unwrap_err(), StoreError::not_found("Survey", "R-404"));
    }

    #[tokio::test]
    async fn test_latest_survey_wins_for_reservation() {
        let (store, _, _) = store();
        store.save(&survey("R-1", "ios")).await.unwrap();
        assert_eq!(store.get_by_reservation_id("R-1").await.unwrap().platform, "ios");
        tokio::time::sleep(Duration::from_millis(2)).await;

        let newer = store.save(&survey("R-1", "web")).await.unwrap();

        let found = store.get_by_reservation_id("R-1").await.unwrap();
        assert_eq!(found.id, newer);
        assert_eq!(found.platform, "web");
    }

    #[tokio::test]
    async fn test_degraded_cache_still_serves_pages() {
        let (store, collection, cache) = store();
        store.save(&survey("R-1", "ios")).await.unwrap();
        cache.set_failing(true);

        let page = store.get_surveys(SurveyQuery::default()).await.unwrap();
        store.save(&survey("R-2", "ios")).await.unwrap();
        let again = store.get_surveys(SurveyQuery::default()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(again.total, 2);
        assert_eq!(collection.read_count(), 4);
    }

    #[tokio::test]
    async fn test_stream_surveys_yields_everything() {
        let (store, collection, cache) = store();
        for reservation in ["R-1", "R-2", "R-3"] {
            store.save(&survey(reservation, "ios")).await.unwrap();
        }

        let reservations: Vec<String> = store
            .stream_surveys()
            .map(|item| item.unwrap().reservation_id)
            .collect()
            .await;

        assert_eq!(reservations, vec!["R-1", "R-2", "R-3"]);
        assert_eq!(collection.read_count(), 0);
        assert!(cache.keys().await.is_empty());
    }
}
