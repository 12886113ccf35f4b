//! Survey entity and listing queries.

mod query;
mod types;

pub use query::{
    Fingerprint, NormalizedQuery, SurveyFilter, SurveyQuery, DEFAULT_LIMIT, DEFAULT_SORT,
    MAX_LIMIT, SORTABLE_FIELDS,
};
pub use types::{
    NewSurvey, SubmittedAnswer, Survey, SurveyPage, SurveyQuestion, SurveySubmission,
};
