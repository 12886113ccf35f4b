//! Collection backends and the cached stores built on them.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): collections held in process memory
//! - `sqlite`: one SQLite table per collection via `rusqlite` and `tokio-rusqlite`
//!
//! The features are mutually exclusive and only select the backend the
//! binary wires up. The in-memory backend is always compiled so tests can
//! run against it.
//!
//! ```bash
//! cargo build -p mango --no-default-features --features sqlite,memory
//! ```

#[cfg(all(feature = "inmemory", feature = "sqlite"))]
compile_error!(
    "Features 'inmemory' and 'sqlite' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'sqlite' feature. \
    Example: cargo build -p mango --features sqlite"
);

pub mod cached;
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::{DocumentStore, QuestionStore, SurveyStore};
