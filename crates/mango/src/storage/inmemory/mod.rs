//! In-memory storage backend.
//!
//! Documents live in an insertion-ordered `Vec` behind `Arc<RwLock<_>>` and
//! are lost when the collection is dropped. Useful for tests and local
//! development.

mod collection;

pub use collection::InMemoryCollection;
