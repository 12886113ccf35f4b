use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use mango_core::storage::{store_error_code, store_error_to_status_code, StoreError};

use crate::service::ServiceError;

/// Error returned by every handler.
///
/// Renders `{"error": {"code", "message", "details": []}}` with the status
/// and code of the underlying store error.
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Status and wire code for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str) {
        let store_error = match self.0.downcast_ref::<ServiceError>() {
            Some(ServiceError::Store(err)) => Some(err),
            Some(ServiceError::Reservation(_)) => {
                return (StatusCode::BAD_GATEWAY, "server_error");
            }
            Some(ServiceError::ReservationLookupDisabled) => {
                return (StatusCode::BAD_REQUEST, "invalid_filter");
            }
            None => self.0.downcast_ref::<StoreError>(),
        };

        match store_error {
            Some(err) => (
                StatusCode::from_u16(store_error_to_status_code(err))
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                store_error_code(err),
            ),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code, "Request failed");
        } else {
            tracing::warn!(error = %self.0, code, "Request rejected");
        }

        let body = json!({
            "error": {
                "code": code,
                "message": self.0.to_string(),
                "details": [],
            }
        });
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: impl Into<anyhow::Error>) -> (StatusCode, serde_json::Value) {
        let response = AppError::from(err).into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_store_error_envelope() {
        let (status, body) = render(ServiceError::Store(StoreError::not_found("Survey", "R-1"))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "resource_not_found");
        assert_eq!(body["error"]["message"], "Survey not found: R-1");
        assert_eq!(body["error"]["details"], json!([]));
    }

    #[tokio::test]
    async fn test_bare_store_error() {
        let (status, body) = render(StoreError::SaveError("empty".to_string())).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "save_error");
    }

    #[tokio::test]
    async fn test_connection_failure_is_unavailable() {
        let (status, body) =
            render(ServiceError::Store(StoreError::ConnectionFailed("down".to_string()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "server_error");
    }

    #[tokio::test]
    async fn test_unknown_error_is_internal() {
        let (status, body) = render(anyhow::anyhow!("boom")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "server_error");
    }

    #[tokio::test]
    async fn test_reservation_lookup_disabled() {
        let (status, body) = render(ServiceError::ReservationLookupDisabled).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_filter");
    }
}
