use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::SurveyKey;
use crate::document::{Document, DocumentId, Status};

/// One answered question of a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub question_id: DocumentId,
    pub rating: i64,
}

/// A submitted survey as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    pub reservation_id: String,
    pub status: Status,
    pub content: String,
    pub platform: String,
    pub questions: Vec<SurveyQuestion>,
    /// Weighted average of the ratings; `None` when every weight was zero.
    #[serde(default)]
    pub total_rating: Option<f64>,
}

impl Document for Survey {
    type Key = SurveyKey;

    const ENTITY: &'static str = "Survey";
    const CREATED_FIELDS: &'static [&'static str] = &["created_at", "updated_at"];
    const UPDATED_FIELDS: &'static [&'static str] = &["updated_at"];

    fn id(&self) -> DocumentId {
        self.id
    }

    fn lifecycle_status(&self) -> Option<Status> {
        Some(self.status)
    }

    fn id_key(id: DocumentId, _status: Option<Status>) -> SurveyKey {
        SurveyKey::Id(id)
    }
}

/// A survey ready to persist, after rating aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSurvey {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    pub reservation_id: String,
    pub status: Status,
    pub content: String,
    pub platform: String,
    pub questions: Vec<SurveyQuestion>,
    pub total_rating: Option<f64>,
}

/// One page of a survey listing plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPage {
    pub surveys: Vec<Survey>,
    pub total: u64,
}

fn default_survey_status() -> Status {
    Status::Active
}

/// A client's answer to one question; the rating may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

/// Survey submission as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub user_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub reservation_id: String,
    #[serde(default = "default_survey_status")]
    pub status: Status,
    #[serde(default)]
    pub content: String,
    pub platform: String,
    pub questions: Vec<SubmittedAnswer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submission_defaults() {
        let submission: SurveySubmission = serde_json::from_value(json!({
            "user_id": "u-1",
            "reservation_id": "R-1",
            "platform": "android",
            "questions": [{"question_id": "q"}]
        }))
        .unwrap();

        assert_eq!(submission.status, Status::Active);
        assert_eq!(submission.staff_id, None);
        assert_eq!(submission.content, "");
        assert_eq!(submission.questions[0].rating, None);
    }

    #[test]
    fn test_stored_survey_without_total_rating() {
        let id = DocumentId::new();
        let question_id = DocumentId::new();
        let survey: Survey = serde_json::from_value(json!({
            "id": id.to_string(),
            "created_at": "2024-01-01T12:00:00.000000Z",
            "updated_at": "2024-01-01T12:00:00.000000Z",
            "user_id": "u-1",
            "reservation_id": "R-1",
            "status": "active",
            "content": "",
            "platform": "ios",
            "questions": [{"question_id": question_id.to_string(), "rating": 4}]
        }))
        .unwrap();

        assert_eq!(survey.total_rating, None);
        assert_eq!(survey.staff_id, None);
        assert_eq!(survey.questions[0].question_id, question_id);
    }

    #[test]
    fn test_survey_key_ignores_status() {
        let id = DocumentId::new();
        assert_eq!(Survey::id_key(id, Some(Status::Active)), SurveyKey::Id(id));
        assert_eq!(Survey::id_keys(id), vec![SurveyKey::Id(id)]);
    }
}
