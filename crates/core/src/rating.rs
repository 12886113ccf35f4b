//! Weighted rating aggregation.
//!
//! A survey's total is the weight-weighted average of its ratings over the
//! questions that were active and tagged for rating when it was submitted:
//!
//! ```text
//! total = round(sum(weight_i * rating_i) / sum(weight_i), 1)
//! ```
//!
//! A zero weight sum yields no total rather than a division error.

use std::collections::HashMap;

use thiserror::Error;

use crate::document::DocumentId;
use crate::storage::StoreError;
use crate::survey::SurveyQuestion;

/// A rating as submitted. An omitted rating counts as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedRating {
    pub question_id: DocumentId,
    pub rating: Option<i64>,
}

impl SubmittedRating {
    pub fn new(question_id: DocumentId, rating: Option<i64>) -> Self {
        Self {
            question_id,
            rating,
        }
    }
}

/// Authoritative weight of a question, as read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedQuestion {
    pub id: DocumentId,
    pub weight: i64,
}

/// Result of a successful aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub total_rating: Option<f64>,
    /// Ratings to persist, in submission order.
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("Question {0} not found")]
    MissingQuestion(DocumentId),
}

impl From<RatingError> for StoreError {
    fn from(error: RatingError) -> Self {
        match error {
            RatingError::MissingQuestion(id) => StoreError::not_found("Question", id),
        }
    }
}

/// Validates that every submitted question is authoritative and computes the
/// weighted total.
///
/// A question id submitted more than once keeps its first position and its
/// last rating.
///
/// # Errors
///
/// Returns `RatingError::MissingQuestion` with the first submitted id that
/// has no authoritative counterpart. Nothing is computed in that case.
///
/// # Examples
///
/// ```
/// use mango_core::document::DocumentId;
/// use mango_core::rating::{aggregate, SubmittedRating, WeightedQuestion};
///
/// let (a, b) = (DocumentId::new(), DocumentId::new());
/// let result = aggregate(
///     &[SubmittedRating::new(a, Some(4)), SubmittedRating::new(b, Some(2))],
///     &[WeightedQuestion { id: a, weight: 2 }, WeightedQuestion { id: b, weight: 3 }],
/// )
/// .unwrap();
/// assert_eq!(result.total_rating, Some(2.8));
/// ```
pub fn aggregate(
    submitted: &[SubmittedRating],
    authoritative: &[WeightedQuestion],
) -> Result<Aggregate, RatingError> {
    let weights: HashMap<DocumentId, i64> = authoritative.iter().map(|q| (q.id, q.weight)).collect();

    let mut order: Vec<DocumentId> = Vec::with_capacity(submitted.len());
    let mut ratings: HashMap<DocumentId, i64> = HashMap::with_capacity(submitted.len());
    for answer in submitted {
        if !weights.contains_key(&answer.question_id) {
            return Err(RatingError::MissingQuestion(answer.question_id));
        }
        if ratings
            .insert(answer.question_id, answer.rating.unwrap_or(0))
            .is_none()
        {
            order.push(answer.question_id);
        }
    }

    let (weighted_sum, weight_sum) = order.iter().fold((0.0_f64, 0.0_f64), |(sum, total), id| {
        let weight = weights[id] as f64;
        (sum + weight * ratings[id] as f64, total + weight)
    });

    let total_rating = (weight_sum != 0.0).then(|| round_to_tenth(weighted_sum / weight_sum));

    Ok(Aggregate {
        total_rating,
        questions: order
            .into_iter()
            .map(|question_id| SurveyQuestion {
                question_id,
                rating: ratings[&question_id],
            })
            .collect(),
    })
}

/// Rounds to one decimal, ties to even (`2.25` becomes `2.2`).
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(id: DocumentId, weight: i64) -> WeightedQuestion {
        WeightedQuestion { id, weight }
    }

    #[test]
    fn test_weighted_average() {
        let (a, b) = (DocumentId::new(), DocumentId::new());

        let result = aggregate(
            &[
                SubmittedRating::new(a, Some(4)),
                SubmittedRating::new(b, Some(2)),
            ],
            &[weighted(a, 2), weighted(b, 3)],
        )
        .unwrap();

        assert_eq!(result.total_rating, Some(2.8));
        assert_eq!(
            result.questions,
            vec![
                SurveyQuestion {
                    question_id: a,
                    rating: 4
                },
                SurveyQuestion {
                    question_id: b,
                    rating: 2
                },
            ]
        );
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        let (a, b, c) = (DocumentId::new(), DocumentId::new(), DocumentId::new());

        let result = aggregate(
            &[
                SubmittedRating::new(a, Some(5)),
                SubmittedRating::new(b, Some(4)),
                SubmittedRating::new(c, Some(4)),
            ],
            &[weighted(a, 1), weighted(b, 1), weighted(c, 1)],
        )
        .unwrap();

        // 13 / 3 = 4.333...
        assert_eq!(result.total_rating, Some(4.3));
    }

    #[test]
    fn test_exact_halves_round_to_even() {
        let (a, b) = (DocumentId::new(), DocumentId::new());

        let lower = aggregate(
            &[SubmittedRating::new(a, Some(3)), SubmittedRating::new(b, Some(2))],
            &[weighted(a, 1), weighted(b, 3)],
        )
        .unwrap();
        let upper = aggregate(
            &[SubmittedRating::new(a, Some(3)), SubmittedRating::new(b, Some(4))],
            &[weighted(a, 1), weighted(b, 3)],
        )
        .unwrap();

        // 9 / 4 = 2.25 and 15 / 4 = 3.75
        assert_eq!(lower.total_rating, Some(2.2));
        assert_eq!(upper.total_rating, Some(3.8));
    }

    #[test]
    fn test_missing_question_fails() {
        let (a, missing) = (DocumentId::new(), DocumentId::new());

        let result = aggregate(
            &[
                SubmittedRating::new(a, Some(4)),
                SubmittedRating::new(missing, Some(2)),
            ],
            &[weighted(a, 2)],
        );

        assert_eq!(result, Err(RatingError::MissingQuestion(missing)));
    }

    #[test]
    fn test_missing_question_maps_to_not_found() {
        let id = DocumentId::new();
        let error: StoreError = RatingError::MissingQuestion(id).into();
        assert_eq!(error, StoreError::not_found("Question", id));
    }

    #[test]
    fn test_zero_weights_give_no_total() {
        let (a, b) = (DocumentId::new(), DocumentId::new());

        let result = aggregate(
            &[
                SubmittedRating::new(a, Some(4)),
                SubmittedRating::new(b, Some(2)),
            ],
            &[weighted(a, 0), weighted(b, 0)],
        )
        .unwrap();

        assert_eq!(result.total_rating, None);
        assert_eq!(result.questions.len(), 2);
    }

    #[test]
    fn test_omitted_rating_counts_as_zero() {
        let (a, b) = (DocumentId::new(), DocumentId::new());

        let result = aggregate(
            &[SubmittedRating::new(a, Some(5)), SubmittedRating::new(b, None)],
            &[weighted(a, 1), weighted(b, 1)],
        )
        .unwrap();

        assert_eq!(result.total_rating, Some(2.5));
        assert_eq!(result.questions[1].rating, 0);
    }

    #[test]
    fn test_duplicate_submission_keeps_last_rating() {
        let a = DocumentId::new();

        let result = aggregate(
            &[SubmittedRating::new(a, Some(1)), SubmittedRating::new(a, Some(5))],
            &[weighted(a, 3)],
        )
        .unwrap();

        assert_eq!(result.total_rating, Some(5.0));
        assert_eq!(result.questions.len(), 1);
        assert_eq!(result.questions[0].rating, 5);
    }

    #[test]
    fn test_unsubmitted_authoritative_questions_are_ignored() {
        let (a, b) = (DocumentId::new(), DocumentId::new());

        let result = aggregate(
            &[SubmittedRating::new(a, Some(3))],
            &[weighted(a, 1), weighted(b, 10)],
        )
        .unwrap();

        assert_eq!(result.total_rating, Some(3.0));
    }

    #[test]
    fn test_empty_submission() {
        let result = aggregate(&[], &[]).unwrap();
        assert_eq!(result.total_rating, None);
        assert!(result.questions.is_empty());
    }
}
