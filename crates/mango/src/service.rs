//! Service facade: one method per RPC, orchestrating the stores.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use mango_core::document::{DocumentId, Status};
use mango_core::question::{
    NewQuestion, Question, QuestionCriteria, QuestionField, QuestionPatch, USER_RATE,
};
use mango_core::rating::{aggregate, SubmittedRating, WeightedQuestion};
use mango_core::storage::StoreError;
use mango_core::survey::{NewSurvey, Survey, SurveyPage, SurveyQuery, SurveySubmission};

use crate::reservation::{intersect_ids, ReservationCriteria, ReservationError, ReservationFilter};
use crate::storage::cached::TypedStream;
use crate::storage::{QuestionStore, SurveyStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error("Reservation filtering is not configured")]
    ReservationLookupDisabled,
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// A question together with the rating scale clients should offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionDetails {
    #[serde(flatten)]
    pub question: Question,
    pub ranges: Vec<i64>,
}

/// Question and survey operations exposed to the transport layer.
#[derive(Clone)]
pub struct MangoService {
    questions: Arc<QuestionStore>,
    surveys: Arc<SurveyStore>,
    reservations: Option<Arc<dyn ReservationFilter>>,
    rating_ranges: Vec<i64>,
}

impl MangoService {
    pub fn new(
        questions: Arc<QuestionStore>,
        surveys: Arc<SurveyStore>,
        rating_ranges: Vec<i64>,
    ) -> Self {
        Self {
            questions,
            surveys,
            reservations: None,
            rating_ranges,
        }
    }

    pub fn with_reservation_filter(mut self, filter: Arc<dyn ReservationFilter>) -> Self {
        self.reservations = Some(filter);
        self
    }

    pub async fn add_question(&self, question: &NewQuestion) -> Result<DocumentId> {
        let id = self.questions.save(question).await.inspect_err(log_failure)?;
        tracing::info!(question_id = %id, "Question added");
        Ok(id)
    }

    pub async fn get_question_by_id(&self, id: &str) -> Result<QuestionDetails> {
        let question = self
            .questions
            .get_question_by_id(id)
            .await
            .inspect_err(log_failure)?;
        Ok(QuestionDetails {
            question,
            ranges: self.rating_ranges.clone(),
        })
    }

    /// Merges `patch` over the stored question and writes it back.
    ///
    /// Returns whether anything changed.
    pub async fn update_question(&self, id: &str, patch: &QuestionPatch) -> Result<bool> {
        let stored = self
            .questions
            .get_question_by_id(id)
            .await
            .inspect_err(log_failure)?;
        let merged = patch.apply_to(&stored);
        let modified = self
            .questions
            .update(id, &merged)
            .await
            .inspect_err(log_failure)?;
        Ok(modified > 0)
    }

    pub async fn delete_question(&self, id: &str) -> Result<bool> {
        let modified = self.questions.delete(id).await.inspect_err(log_failure)?;
        Ok(modified > 0)
    }

    pub async fn list_questions(&self) -> Result<Vec<Question>> {
        Ok(self.questions.get_questions().await.inspect_err(log_failure)?)
    }

    /// Validates the answers against the active rating questions, computes
    /// the weighted total and stores the survey.
    ///
    /// # Errors
    ///
    /// `InvalidId` for a malformed question id, `DocumentNotFound` when an
    /// answered question is not an active rating question.
    pub async fn add_survey(&self, submission: SurveySubmission) -> Result<Survey> {
        let submitted = submission
            .questions
            .iter()
            .map(|answer| {
                DocumentId::parse(&answer.question_id)
                    .map(|id| SubmittedRating::new(id, answer.rating))
            })
            .collect::<std::result::Result<Vec<_>, StoreError>>()
            .inspect_err(log_failure)?;

        let authoritative = self.rating_weights(&submitted).await?;
        let totals = aggregate(&submitted, &authoritative)
            .map_err(StoreError::from)
            .inspect_err(log_failure)?;

        let survey = NewSurvey {
            user_id: submission.user_id,
            staff_id: submission.staff_id,
            reservation_id: submission.reservation_id,
            status: submission.status,
            content: submission.content,
            platform: submission.platform,
            questions: totals.questions,
            total_rating: totals.total_rating,
        };
        let id = self.surveys.save(&survey).await.inspect_err(log_failure)?;
        tracing::info!(survey_id = %id, total_rating = ?survey.total_rating, "Survey added");

        Ok(self
            .surveys
            .get_survey_by_id(&id.to_string())
            .await
            .inspect_err(log_failure)?)
    }

    async fn rating_weights(&self, submitted: &[SubmittedRating]) -> Result<Vec<WeightedQuestion>> {
        let ids: HashSet<DocumentId> = submitted.iter().map(|s| s.question_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let criteria = QuestionCriteria::by_ids(ids)
            .included_in(USER_RATE)
            .with_status(Status::Active)
            .project([QuestionField::Weight]);
        let questions = self
            .questions
            .get_questions_by_filters(&criteria)
            .await
            .inspect_err(log_failure)?;

        Ok(questions
            .into_iter()
            .map(|q| WeightedQuestion {
                id: q.id,
                weight: q.weight.unwrap_or(0),
            })
            .collect())
    }

    pub async fn get_survey(&self, id: &str) -> Result<Survey> {
        Ok(self
            .surveys
            .get_survey_by_id(id)
            .await
            .inspect_err(log_failure)?)
    }

    pub async fn get_survey_by_reservation_id(&self, reservation_id: &str) -> Result<Survey> {
        Ok(self
            .surveys
            .get_by_reservation_id(reservation_id)
            .await
            .inspect_err(log_failure)?)
    }

    /// Lists surveys, first narrowing the query to the reservations that
    /// match `criteria` when any are given.
    pub async fn list_surveys(
        &self,
        mut query: SurveyQuery,
        criteria: &ReservationCriteria,
    ) -> Result<SurveyPage> {
        if !criteria.is_empty() {
            let Some(reservations) = &self.reservations else {
                return Err(ServiceError::ReservationLookupDisabled);
            };
            let allowed = reservations
                .reservation_ids(criteria)
                .await
                .inspect_err(|err| tracing::error!(error = %err, "Reservation lookup failed"))?;
            query.filter.reservation_ids =
                Some(intersect_ids(query.filter.reservation_ids.take(), allowed));
        }

        Ok(self.surveys.get_surveys(query).await.inspect_err(log_failure)?)
    }

    /// Every stored survey, streamed from the database.
    pub fn export_surveys(&self) -> TypedStream<Survey> {
        tracing::info!("Survey export started");
        self.surveys.stream_surveys()
    }
}

fn log_failure(err: &StoreError) {
    tracing::error!(error = %err, "Service call failed");
}
