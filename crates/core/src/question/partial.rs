use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QuestionTitle;
use crate::document::{DocumentId, Status};

/// A question materialized through a projection. Only `id` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialQuestion {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<QuestionTitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_in: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_only() {
        let id = DocumentId::new();
        let partial: PartialQuestion =
            serde_json::from_value(json!({"id": id.to_string()})).unwrap();

        assert_eq!(partial.id, id);
        assert_eq!(partial.weight, None);
        assert_eq!(serde_json::to_value(&partial).unwrap(), json!({"id": id.to_string()}));
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_value::<PartialQuestion>(json!({"weight": 1})).is_err());
    }
}
