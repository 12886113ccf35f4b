//! Partial question updates.
//!
//! Clients send only what they want to change. Empty strings, empty tag
//! lists and zero numbers are treated as "not sent" and keep the stored
//! value.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Question, QuestionTitle};
use crate::document::Status;

/// Deserialize an optional string, treating blank strings as None.
fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Deserialize an optional integer, treating zero as None.
fn deserialize_optional_nonzero<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let n: Option<i64> = Option::deserialize(deserializer)?;
    Ok(n.filter(|n| *n != 0))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTitlePatch {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub on_rate: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub on_display: Option<String>,
}

/// Fields of a question update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub title: Option<QuestionTitlePatch>,
    #[serde(default)]
    pub include_in: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "deserialize_optional_nonzero")]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_nonzero")]
    pub weight: Option<i64>,
}

impl QuestionPatch {
    /// Merges the patch over a stored question.
    ///
    /// The result keeps the stored id and creation time.
    pub fn apply_to(&self, stored: &Question) -> Question {
        let title = self.title.clone().unwrap_or_default();
        let include_in = self
            .include_in
            .clone()
            .filter(|tags| !tags.is_empty())
            .unwrap_or_else(|| stored.include_in.clone());

        Question {
            id: stored.id,
            title: QuestionTitle {
                on_rate: title.on_rate.unwrap_or_else(|| stored.title.on_rate.clone()),
                on_display: title
                    .on_display
                    .unwrap_or_else(|| stored.title.on_display.clone()),
            },
            include_in,
            weight: self.weight.unwrap_or(stored.weight),
            order: self.order.unwrap_or(stored.order),
            status: self.status.unwrap_or(stored.status),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| stored.category.clone()),
            created_at: stored.created_at,
        }
    }
}
