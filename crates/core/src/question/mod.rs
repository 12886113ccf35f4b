//! Question entity: stored shape, creation payload, partial updates and
//! batch lookup criteria.

mod criteria;
mod partial;
mod patch;
mod types;

pub use criteria::{QuestionCriteria, QuestionField};
pub use partial::PartialQuestion;
pub use patch::{QuestionPatch, QuestionTitlePatch};
pub use types::{NewQuestion, Question, QuestionTitle, RATE_DISPLAY, USER_RATE};
