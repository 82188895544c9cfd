use axum::extract::multipart::MultipartError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use sqlx::Error as SqlxError;

use crate::plugins::stories::error::StoryError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), code: None }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message).with_code("invalid_input")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        }
        let body = ErrorBody { error: self.message, code: self.code };
        (self.status, Json(body)).into_response()
    }
}

impl From<(StatusCode, String)> for AppError {
    fn from((status, msg): (StatusCode, String)) -> Self {
        AppError::new(status, msg)
    }
}

impl From<SqlxError> for AppError {
    fn from(e: SqlxError) -> Self {
        use sqlx::Error::*;
        match e {
            RowNotFound => AppError::new(StatusCode::NOT_FOUND, "notFound").with_code("not_found"),
            Database(db) => {
                if db.code().as_deref() == Some("23505") {
                    let code_str = match db.constraint() {
                        Some(cons) if cons.contains("username") => "duplicate_username",
                        Some(cons) if cons.contains("email") => "duplicate_email",
                        _ => "duplicate_key",
                    };
                    return AppError::new(StatusCode::CONFLICT, "duplicateKey").with_code(code_str);
                }
                AppError::internal(db.message().to_string())
            }
            other => AppError::internal(other.to_string()),
        }
    }
}

impl From<StoryError> for AppError {
    fn from(e: StoryError) -> Self {
        match e {
            StoryError::Validation(_) => {
                AppError::new(StatusCode::BAD_REQUEST, e.to_string()).with_code("invalid_media")
            }
            StoryError::NotFound(_) => {
                AppError::new(StatusCode::NOT_FOUND, e.to_string()).with_code("not_found")
            }
            StoryError::Permission(_) => {
                AppError::new(StatusCode::FORBIDDEN, e.to_string()).with_code("forbidden")
            }
            StoryError::Conflict(_) => {
                AppError::new(StatusCode::CONFLICT, e.to_string()).with_code("retry")
            }
            StoryError::Storage(inner) => AppError::from(inner),
            StoryError::Media(inner) => AppError::internal(format!("media store failure: {inner}")),
        }
    }
}

/// Body-limit rejections keep their 413 so clients can tell "too large"
/// apart from a malformed body.
impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE { "payload_too_large" } else { "invalid_multipart" };
        AppError::new(status, e.body_text()).with_code(code)
    }
}
