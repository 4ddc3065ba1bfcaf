use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::Error;
use crate::storage::StorageError;

/// Standard API envelope: `{"success": true, ...payload}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(payload: T) -> Self {
        Self {
            success: true,
            payload,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// API error that renders as `{"success": false, "error": message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_string(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(message) | Error::Conflict(message) => Self::bad_request(message),
            Error::InvalidCredentials | Error::SizeLimit { .. } => Self::bad_request(e.to_string()),
            Error::NotFound => Self::not_found("Not found"),
            Error::Storage(StorageError::NotFound) => {
                tracing::warn!("document metadata points at a missing object");
                Self::not_found("File not found in storage")
            }
            Error::Storage(err) => {
                tracing::warn!("storage error: {err}");
                Self::bad_request(format!("Storage error: {err}"))
            }
            Error::Unauthorized => Self::unauthorized("Authentication required"),
            Error::Database(err) => {
                tracing::error!("database error: {err}");
                Self::internal("Internal server error")
            }
            Error::Io(_) | Error::Config(_) | Error::Template(_) => {
                tracing::error!("{e}");
                Self::internal("Internal server error")
            }
        }
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
