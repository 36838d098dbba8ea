use crate::response::{ApiResponse, Status};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    /// Path resolved outside the upload root, or an attempt on the root itself.
    Forbidden(String),
    Conflict(String),
    Validation(String),
}

impl std::error::Error for AppError {}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl AppError {
    fn parts(self) -> (StatusCode, Status, String) {
        match self {
            AppError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Status::InternalError, msg)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Status::InvalidRequest, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Status::NotFound, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Status::Unauthorized, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, Status::Forbidden, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, Status::Conflict, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Status::ValidationError, msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (http_status, status, message) = self.parts();

        if http_status.is_server_error() {
            tracing::error!(status = %http_status, "{}", message);
        }

        let body = Json(ApiResponse::error(status, message, json!({})));
        (http_status, body).into_response()
    }
}

// Helper to convert standard errors to AppError
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound("File not found".to_string()),
            std::io::ErrorKind::AlreadyExists => AppError::Conflict(err.to_string()),
            _ => AppError::InternalServerError(err.to_string()),
        }
    }
}
