//! Structured cache keys.
//!
//! Every key renders as `{NAMESPACE}:{suffix}`. Namespaces keep question and
//! survey entries apart, and the survey listing keys share a `PAGE:` family
//! prefix so one pattern purges all of them.

use crate::document::{DocumentId, Status};
use crate::survey::Fingerprint;

pub const QUESTION_NAMESPACE: &str = "MANGO:QUESTION";
pub const SURVEY_NAMESPACE: &str = "MANGO:SURVEY";

/// Segment marking keys that belong to a purgeable family.
const FAMILY_SEGMENT: &str = ":PAGE:";

/// A typed cache key scoped under an entity namespace.
pub trait CacheKey: Send + Sync {
    const NAMESPACE: &'static str;

    /// The part of the key after the namespace.
    fn suffix(&self) -> String;

    /// The full key sent to the cache backend.
    fn render(&self) -> String {
        format!("{}:{}", Self::NAMESPACE, self.suffix())
    }
}

/// Cache keys of the question store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuestionKey {
    /// `MANGO:QUESTION:{id}`
    Id(DocumentId),
    /// `MANGO:QUESTION:{id}:{STATUS}`
    IdWithStatus(DocumentId, Status),
    /// `MANGO:QUESTION:ALL`, the listing of every non-deleted question.
    All,
}

impl QuestionKey {
    /// Builds the by-id key, qualified by status when one is given.
    pub fn for_lookup(id: DocumentId, status: Option<Status>) -> Self {
        match status {
            Some(status) => QuestionKey::IdWithStatus(id, status),
            None => QuestionKey::Id(id),
        }
    }

    /// Every key that may hold a copy of the question with this id.
    pub fn every_key_for(id: DocumentId) -> Vec<QuestionKey> {
        let mut keys = vec![QuestionKey::Id(id)];
        keys.extend(
            [Status::Active, Status::Inactive, Status::Deleted]
                .into_iter()
                .map(|status| QuestionKey::IdWithStatus(id, status)),
        );
        keys
    }
}

impl CacheKey for QuestionKey {
    const NAMESPACE: &'static str = QUESTION_NAMESPACE;

    fn suffix(&self) -> String {
        match self {
            QuestionKey::Id(id) => id.to_string(),
            QuestionKey::IdWithStatus(id, status) => format!("{}:{}", id, status.key_tag()),
            QuestionKey::All => "ALL".to_string(),
        }
    }
}

/// Cache keys of the survey store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurveyKey {
    /// `MANGO:SURVEY:{id}`
    Id(DocumentId),
    /// `MANGO:SURVEY:RESERVATION:{reservation_id}`
    ReservationId(String),
    /// `MANGO:SURVEY:PAGE:{fingerprint}:ITEMS`
    PageItems(Fingerprint),
    /// `MANGO:SURVEY:PAGE:{fingerprint}:COUNT`
    PageCount(Fingerprint),
}

impl SurveyKey {
    /// Pattern matching every paginated-listing key.
    pub fn pages_pattern() -> String {
        format!("{}{}*", SURVEY_NAMESPACE, FAMILY_SEGMENT)
    }
}

impl CacheKey for SurveyKey {
    const NAMESPACE: &'static str = SURVEY_NAMESPACE;

    fn suffix(&self) -> String {
        match self {
            SurveyKey::Id(id) => id.to_string(),
            SurveyKey::ReservationId(reservation_id) => format!("RESERVATION:{reservation_id}"),
            SurveyKey::PageItems(fingerprint) => format!("PAGE:{fingerprint}:ITEMS"),
            SurveyKey::PageCount(fingerprint) => format!("PAGE:{fingerprint}:COUNT"),
        }
    }
}

/// Returns the family prefix (up to and including `:PAGE:`) of a key that
/// belongs to a purgeable family.
///
/// # Examples
///
/// ```
/// use mango_core::cache::family_of_key;
///
/// assert_eq!(family_of_key("MANGO:SURVEY:PAGE:ab12:ITEMS"), Some("MANGO:SURVEY:PAGE:"));
/// assert_eq!(family_of_key("MANGO:QUESTION:ALL"), None);
/// ```
pub fn family_of_key(key: &str) -> Option<&str> {
    let start = key.find(FAMILY_SEGMENT)?;
    let end = start + FAMILY_SEGMENT.len();
    if end == key.len() {
        return None;
    }
    Some(&key[..end])
}

/// Returns the family prefix of a pattern of the form `{family}*`.
///
/// Patterns with wildcards before the family segment, or with anything
/// but a single trailing `*` after it, are not family patterns.
///
/// # Examples
///
/// ```
/// use mango_core::cache::family_of_pattern;
///
/// assert_eq!(family_of_pattern("MANGO:SURVEY:PAGE:*"), Some("MANGO:SURVEY:PAGE:"));
/// assert_eq!(family_of_pattern("MANGO:*:PAGE:*"), None);
/// assert_eq!(family_of_pattern("MANGO:SURVEY:*"), None);
/// ```
pub fn family_of_pattern(pattern: &str) -> Option<&str> {
    let prefix = pattern.strip_suffix('*')?;
    if prefix.contains(['*', '?']) || !prefix.ends_with(FAMILY_SEGMENT) {
        return None;
    }
    Some(prefix)
}

/// Key of the set that tracks the members of a key family.
pub fn family_tracking_key(family: &str) -> String {
    format!("_tracking:{family}")
}
