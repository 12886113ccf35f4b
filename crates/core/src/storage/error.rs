use thiserror::Error;

use crate::document::TransitionError;

/// Errors surfaced by the document stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid id: {0:?}")]
    InvalidId(String),
    #[error("{entity_type} not found: {id}")]
    DocumentNotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("Save failed: {0}")]
    SaveError(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        StoreError::DocumentNotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

impl From<TransitionError> for StoreError {
    fn from(error: TransitionError) -> Self {
        StoreError::SaveError(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Status, Transition};

    #[test]
    fn test_invalid_id_display() {
        let error = StoreError::InvalidId("abc".to_string());
        assert_eq!(error.to_string(), "Invalid id: \"abc\"");
    }

    #[test]
    fn test_not_found_display() {
        let error = StoreError::not_found("Question", "q-123");
        assert_eq!(error.to_string(), "Question not found: q-123");
    }

    #[test]
    fn test_save_error_display() {
        let error = StoreError::SaveError("empty payload".to_string());
        assert_eq!(error.to_string(), "Save failed: empty payload");
    }

    #[test]
    fn test_invalid_filter_display() {
        let error = StoreError::InvalidFilter("invalid sort key: \"x\"".to_string());
        assert_eq!(error.to_string(), "Invalid filter: invalid sort key: \"x\"");
    }

    #[test]
    fn test_transition_error_becomes_save_error() {
        let error: StoreError = Status::check_transition(None, Status::Deleted, Transition::Update)
            .unwrap_err()
            .into();
        assert!(matches!(error, StoreError::SaveError(_)));
    }

    #[test]
    fn test_json_error_becomes_serialization() {
        let json_error = serde_json::from_str::<u32>("x").unwrap_err();
        let error: StoreError = json_error.into();
        assert!(matches!(error, StoreError::Serialization(_)));
    }
}
