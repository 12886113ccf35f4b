use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::QuestionKey;
use crate::document::{Document, DocumentId, Status};

/// Inclusion tag of questions shown on the rating form.
pub const USER_RATE: &str = "user_rate";
/// Inclusion tag of questions shown on published ratings.
pub const RATE_DISPLAY: &str = "rate_display";

/// Bilingual question title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTitle {
    /// Label shown while rating.
    pub on_rate: String,
    /// Label shown next to a published rating.
    pub on_display: String,
}

impl QuestionTitle {
    pub fn new(on_rate: impl Into<String>, on_display: impl Into<String>) -> Self {
        Self {
            on_rate: on_rate.into(),
            on_display: on_display.into(),
        }
    }
}

/// A survey question as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: DocumentId,
    pub title: QuestionTitle,
    pub include_in: Vec<String>,
    pub weight: i64,
    pub order: i64,
    pub status: Status,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn is_included_in(&self, tag: &str) -> bool {
        self.include_in.iter().any(|t| t == tag)
    }
}

impl Document for Question {
    type Key = QuestionKey;

    const ENTITY: &'static str = "Question";

    fn id(&self) -> DocumentId {
        self.id
    }

    fn lifecycle_status(&self) -> Option<Status> {
        Some(self.status)
    }

    fn id_key(id: DocumentId, status: Option<Status>) -> QuestionKey {
        QuestionKey::for_lookup(id, status)
    }

    fn id_keys(id: DocumentId) -> Vec<QuestionKey> {
        QuestionKey::every_key_for(id)
    }
}

fn default_include_in() -> Vec<String> {
    vec![USER_RATE.to_string(), RATE_DISPLAY.to_string()]
}

/// Payload of a question to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub title: QuestionTitle,
    #[serde(default = "default_include_in")]
    pub include_in: Vec<String>,
    pub weight: i64,
    pub order: i64,
    #[serde(default)]
    pub status: Status,
    pub category: String,
}

impl NewQuestion {
    pub fn new(title: QuestionTitle, weight: i64, order: i64, category: impl Into<String>) -> Self {
        Self {
            title,
            include_in: default_include_in(),
            weight,
            order,
            status: Status::default(),
            category: category.into(),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_include_in<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.include_in = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_question_defaults() {
        let payload: NewQuestion = serde_json::from_value(json!({
            "title": {"on_rate": "How clean was the room?", "on_display": "Cleanliness"},
            "weight": 2,
            "order": 1,
            "category": "customer_survey"
        }))
        .unwrap();

        assert_eq!(payload.status, Status::Inactive);
        assert_eq!(payload.include_in, vec!["user_rate", "rate_display"]);
    }

    #[test]
    fn test_new_question_rejects_missing_title_label() {
        let result = serde_json::from_value::<NewQuestion>(json!({
            "title": {"on_rate": "How clean was the room?"},
            "weight": 2,
            "order": 1,
            "category": "customer_survey"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_question_keys() {
        let id = DocumentId::new();
        assert_eq!(Question::id_key(id, None), QuestionKey::Id(id));
        assert_eq!(Question::id_keys(id).len(), 4);
    }

    #[test]
    fn test_is_included_in() {
        let question = Question {
            id: DocumentId::new(),
            title: QuestionTitle::new("a", "b"),
            include_in: vec![USER_RATE.to_string()],
            weight: 1,
            order: 1,
            status: Status::Active,
            category: "c".to_string(),
            created_at: Utc::now(),
        };
        assert!(question.is_included_in(USER_RATE));
        assert!(!question.is_included_in(RATE_DISPLAY));
    }
}
