//! Pure functions mapping [`StoreError`] onto wire error codes and HTTP
//! status codes.

use super::StoreError;

/// Stable machine-readable code of an error, as sent to clients.
///
/// Backend failures collapse into `server_error`; their messages are not
/// part of the contract.
///
/// # Examples
///
/// ```
/// use mango_core::storage::{store_error_code, StoreError};
///
/// assert_eq!(store_error_code(&StoreError::not_found("Survey", "s-1")), "resource_not_found");
/// ```
pub fn store_error_code(error: &StoreError) -> &'static str {
    match error {
        StoreError::InvalidId(_) => "invalid_id",
        StoreError::DocumentNotFound { .. } => "resource_not_found",
        StoreError::SaveError(_) => "save_error",
        StoreError::InvalidFilter(_) => "invalid_filter",
        StoreError::ConnectionFailed(_)
        | StoreError::QueryFailed(_)
        | StoreError::Serialization(_) => "server_error",
    }
}

/// Maps a [`StoreError`] to an HTTP status code.
///
/// - `InvalidId` -> 400
/// - `DocumentNotFound` -> 404
/// - `SaveError` -> 422
/// - `InvalidFilter` -> 400
/// - `ConnectionFailed` -> 503
/// - `QueryFailed`, `Serialization` -> 500
pub fn store_error_to_status_code(error: &StoreError) -> u16 {
    match error {
        StoreError::InvalidId(_) => 400,
        StoreError::DocumentNotFound { .. } => 404,
        StoreError::SaveError(_) => 422,
        StoreError::InvalidFilter(_) => 400,
        StoreError::ConnectionFailed(_) => 503,
        StoreError::QueryFailed(_) => 500,
        StoreError::Serialization(_) => 500,
    }
}
