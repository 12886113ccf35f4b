//! Cache-aside document stores.
//!
//! - **Reads**: check the cache first, on miss read the collection and
//!   populate the cache
//! - **Writes**: persist to the collection, then invalidate (or refresh)
//!   every cache entry the write could have made stale
//!
//! Cache failures never fail a call. They are logged and the store falls
//! back to the collection.
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let collection = Arc::new(InMemoryCollection::new("questions"));
//! let cache = Arc::new(MemoryCache::new(10_000));
//!
//! let questions = QuestionStore::new(collection, cache, Duration::from_secs(300));
//! ```

mod document;
mod question;
mod survey;

pub use document::{DocumentStore, TypedStream};
pub use question::QuestionStore;
pub use survey::SurveyStore;
