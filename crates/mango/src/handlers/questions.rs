//! Question handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use mango_core::question::{NewQuestion, Question, QuestionPatch};
use mango_core::storage::StoreError;

use crate::{handlers::AppError, service::QuestionDetails, state::AppState};

/// Turns a body rejection into a `save_error`.
pub(crate) fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::from(StoreError::SaveError(rejection.body_text()))
}

/// Create a question (POST /api/questions).
pub async fn create_question(
    State(state): State<AppState>,
    payload: Result<Json<NewQuestion>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(question) = payload.map_err(invalid_body)?;

    let id = state.service.add_question(&question).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// List every active or inactive question (GET /api/questions).
pub async fn list_questions(State(state): State<AppState>) -> Result<Json<Vec<Question>>, AppError> {
    Ok(Json(state.service.list_questions().await?))
}

/// Get a question and the rating scale (GET /api/questions/{id}).
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionDetails>, AppError> {
    Ok(Json(state.service.get_question_by_id(&id).await?))
}

/// Patch a question (PUT /api/questions/{id}).
///
/// Blank strings and zero numbers in the body keep the stored value.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<QuestionPatch>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(patch) = payload.map_err(invalid_body)?;

    let is_updated = state.service.update_question(&id, &patch).await?;

    Ok(Json(json!({ "is_updated": is_updated })))
}

/// Soft-delete a question (DELETE /api/questions/{id}).
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let is_deleted = state.service.delete_question(&id).await?;

    Ok(Json(json!({ "is_deleted": is_deleted })))
}
