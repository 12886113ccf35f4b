mod error;
mod keys;
mod patterns;
mod serialization;
mod traits;
mod wrapper;

pub use error::{CacheError, Result};
pub use keys::{
    family_of_key, family_of_pattern, family_tracking_key, CacheKey, QuestionKey, SurveyKey,
    QUESTION_NAMESPACE, SURVEY_NAMESPACE,
};
pub use patterns::pattern_matches;
pub use serialization::{deserialize_value, serialize_value, SerializationError};
pub use traits::Cache;
pub use wrapper::CacheWrapper;
