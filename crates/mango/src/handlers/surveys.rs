//! Survey handlers.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tokio_stream::StreamExt;

use mango_core::document::Status;
use mango_core::storage::StoreError;
use mango_core::survey::{Survey, SurveyPage, SurveyQuery, SurveySubmission};

use super::questions::invalid_body;
use crate::{handlers::AppError, reservation::ReservationCriteria, state::AppState};

/// Query parameters prefixed with this are reservation criteria.
const RESERVATION_PREFIX: &str = "reservation.";

/// Builds a listing query from raw query parameters.
///
/// Recognised keys: `skip`, `limit`, `sort`, `user_id`, `staff_id`,
/// `status`, `platform`, `reservation_id` (repeatable, or comma separated),
/// and any `reservation.{attribute}` criterion.
fn parse_listing(
    params: Vec<(String, String)>,
) -> Result<(SurveyQuery, ReservationCriteria), StoreError> {
    let mut query = SurveyQuery::default();
    let mut criteria = ReservationCriteria::new();

    for (key, value) in params {
        match key.as_str() {
            "skip" => query.skip = Some(parse_number(&key, &value)?),
            "limit" => query.limit = Some(parse_number(&key, &value)?),
            "sort" => query.sort = Some(value),
            "user_id" => query.filter.user_id = Some(value),
            "staff_id" => query.filter.staff_id = Some(value),
            "platform" => query.filter.platform = Some(value),
            "status" => {
                let status = value
                    .parse::<Status>()
                    .map_err(StoreError::InvalidFilter)?;
                query.filter.status = Some(status);
            }
            "reservation_id" | "reservation_ids" => query
                .filter
                .reservation_ids
                .get_or_insert_with(Vec::new)
                .extend(value.split(',').map(|id| id.trim().to_string())),
            other => match other.strip_prefix(RESERVATION_PREFIX) {
                Some(attribute) if !attribute.is_empty() => {
                    criteria.insert(attribute.to_string(), value);
                }
                _ => {
                    return Err(StoreError::InvalidFilter(format!(
                        "unknown query parameter {other:?}"
                    )))
                }
            },
        }
    }

    Ok((query, criteria))
}

fn parse_number(key: &str, value: &str) -> Result<i64, StoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| StoreError::InvalidFilter(format!("{key} must be an integer, got {value:?}")))
}

/// Submit a survey (POST /api/surveys).
pub async fn create_survey(
    State(state): State<AppState>,
    payload: Result<Json<SurveySubmission>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(submission) = payload.map_err(invalid_body)?;

    let survey = state.service.add_survey(submission).await?;

    Ok((StatusCode::CREATED, Json(survey)))
}

/// List surveys (GET /api/surveys).
pub async fn list_surveys(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<SurveyPage>, AppError> {
    let (query, criteria) = parse_listing(params)?;

    Ok(Json(state.service.list_surveys(query, &criteria).await?))
}

/// Get a survey by id (GET /api/surveys/{id}).
pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Survey>, AppError> {
    Ok(Json(state.service.get_survey(&id).await?))
}

/// Get the survey of a reservation (GET /api/surveys/reservation/{reservation_id}).
pub async fn get_survey_by_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
) -> Result<Json<Survey>, AppError> {
    Ok(Json(
        state
            .service
            .get_survey_by_reservation_id(&reservation_id)
            .await?,
    ))
}

/// Export every survey as newline-delimited JSON (GET /api/surveys/export).
pub async fn export_surveys(State(state): State<AppState>) -> impl IntoResponse {
    let lines = state.service.export_surveys().map(|item| {
        item.and_then(|survey| serde_json::to_string(&survey).map_err(StoreError::from))
            .map(|mut line| {
                line.push('\n');
                line
            })
            .inspect_err(|err| tracing::error!(error = %err, "Survey export interrupted"))
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_listing() {
        let (query, criteria) = parse_listing(params(&[
            ("skip", "10"),
            ("limit", "5"),
            ("sort", "+total_rating"),
            ("status", "active"),
            ("reservation_id", "R-1,R-2"),
            ("reservation_id", "R-3"),
            ("reservation.hotel", "h1"),
        ]))
        .unwrap();

        assert_eq!(query.skip, Some(10));
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.sort.as_deref(), Some("+total_rating"));
        assert_eq!(query.filter.status, Some(Status::Active));
        assert_eq!(
            query.filter.reservation_ids,
            Some(vec!["R-1".to_string(), "R-2".to_string(), "R-3".to_string()])
        );
        assert_eq!(criteria.get("hotel").map(String::as_str), Some("h1"));
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        assert!(matches!(
            parse_listing(params(&[("limit", "ten")])),
            Err(StoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse_listing(params(&[("status", "archived")])),
            Err(StoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse_listing(params(&[("colour", "red")])),
            Err(StoreError::InvalidFilter(_))
        ));
    }
}
