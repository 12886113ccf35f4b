//! SQLite storage backend.
//!
//! Documents are stored as JSON text through `rusqlite`, wrapped for async
//! use by `tokio-rusqlite`.

mod collection;
mod error;
mod schema;

pub use collection::{SqliteCollection, SqliteDatabase};
