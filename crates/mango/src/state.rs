//! Shared application state and backend wiring.
//!
//! The collection and cache backends are chosen at compile time by the
//! storage (`inmemory` | `sqlite`) and cache (`memory` | `redis`) features.

use std::sync::Arc;

use mango_core::cache::Cache;
use mango_core::storage::DocumentCollection;

use crate::config::Config;
use crate::reservation::HttpReservationFilter;
use crate::service::MangoService;
use crate::storage::{QuestionStore, SurveyStore};

pub const QUESTIONS_COLLECTION: &str = "questions";
pub const SURVEYS_COLLECTION: &str = "surveys";

/// Shared application state, cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: MangoService,
}

impl AppState {
    pub fn from_service(service: MangoService) -> Self {
        Self { service }
    }

    /// Opens the configured backends and builds the service on top.
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let (questions, surveys) = open_collections(config).await?;
        let cache = open_cache(config).await?;
        Ok(Self::from_backends(questions, surveys, cache, config))
    }

    /// Builds the state from already opened backends.
    pub fn from_backends(
        questions: Arc<dyn DocumentCollection>,
        surveys: Arc<dyn DocumentCollection>,
        cache: Arc<dyn Cache>,
        config: &Config,
    ) -> Self {
        let ttl = config.cache_ttl();
        let mut service = MangoService::new(
            Arc::new(QuestionStore::new(questions, Arc::clone(&cache), ttl)),
            Arc::new(SurveyStore::new(surveys, cache, ttl)),
            config.rating_ranges.clone(),
        );
        if let Some(url) = &config.reservation_lookup_url {
            tracing::info!(url = %url, "Reservation lookup enabled");
            service = service.with_reservation_filter(Arc::new(HttpReservationFilter::new(url)));
        }
        Self::from_service(service)
    }
}

#[cfg(feature = "inmemory")]
async fn open_collections(
    _config: &Config,
) -> Result<(Arc<dyn DocumentCollection>, Arc<dyn DocumentCollection>), anyhow::Error> {
    use crate::storage::inmemory::InMemoryCollection;

    tracing::info!("Using in-memory collections");
    Ok((
        Arc::new(InMemoryCollection::new(QUESTIONS_COLLECTION)),
        Arc::new(InMemoryCollection::new(SURVEYS_COLLECTION)),
    ))
}

#[cfg(feature = "sqlite")]
async fn open_collections(
    config: &Config,
) -> Result<(Arc<dyn DocumentCollection>, Arc<dyn DocumentCollection>), anyhow::Error> {
    use crate::storage::sqlite::SqliteDatabase;

    tracing::info!(path = %config.sqlite_path, "Opening SQLite database");
    let database = SqliteDatabase::open(&config.sqlite_path).await?;
    Ok((
        Arc::new(database.collection(QUESTIONS_COLLECTION).await?),
        Arc::new(database.collection(SURVEYS_COLLECTION).await?),
    ))
}

#[cfg(feature = "memory")]
async fn open_cache(config: &Config) -> Result<Arc<dyn Cache>, anyhow::Error> {
    use crate::cache::MemoryCache;

    if config.cache_max_entries == 0 {
        anyhow::bail!("CACHE_MAX_ENTRIES must be greater than zero");
    }
    tracing::info!(max_entries = config.cache_max_entries, "Using in-memory cache");
    Ok(Arc::new(MemoryCache::new(config.cache_max_entries)))
}

#[cfg(feature = "redis")]
async fn open_cache(config: &Config) -> Result<Arc<dyn Cache>, anyhow::Error> {
    use crate::cache::RedisCache;

    tracing::info!(url = %config.redis_url, "Connecting to Redis cache");
    Ok(Arc::new(RedisCache::new(&config.redis_url).await?))
}
