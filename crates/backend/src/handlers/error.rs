use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::shared::logger::ApiErrorBody;
use thiserror::Error;

/// Ошибки /api/logs. Тексты совпадают с тем, что ожидает клиент.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid log type")]
    InvalidLogType,

    #[error("Invalid request body")]
    InvalidBody,

    #[error("Failed to write log")]
    WriteFailed,

    #[error("Failed to clear logs")]
    ClearFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidLogType | ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::WriteFailed | ApiError::ClearFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
