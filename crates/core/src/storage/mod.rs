mod error;
mod http_mapping;
mod traits;

pub use error::{Result, StoreError};
pub use http_mapping::{store_error_code, store_error_to_status_code};
pub use traits::{apply_set, DocumentCollection, DocumentStream, UpdateResult};
