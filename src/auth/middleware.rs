use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use super::helpers::{SessionValidationError, extract_session_token, validate_session};
use crate::server::AppState;
use crate::types::User;

/// Extractor for API routes: requires a valid session, rejects with a JSON 401.
pub struct RequireUser {
    pub user: User,
}

/// Extractor for HTML pages: requires a valid session, redirects to the login page.
pub struct PageUser {
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidSession,
    SessionExpired,
    InactiveUser,
    InternalError,
}

impl From<SessionValidationError> for AuthError {
    fn from(e: SessionValidationError) -> Self {
        match e {
            SessionValidationError::InvalidToken => AuthError::InvalidSession,
            SessionValidationError::SessionExpired => AuthError::SessionExpired,
            SessionValidationError::InactiveUser => AuthError::InactiveUser,
            SessionValidationError::InternalError => AuthError::InternalError,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidSession => (StatusCode::UNAUTHORIZED, "Invalid session"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::InactiveUser => (StatusCode::FORBIDDEN, "Account is disabled"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}

/// Rejection for page extractors.
pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = extract_session_token(&parts.headers).ok_or(AuthError::MissingAuth)?;
        let user = validate_session(state, &raw_token)?;
        Ok(RequireUser { user })
    }
}

impl FromRequestParts<Arc<AppState>> for PageUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = extract_session_token(&parts.headers).ok_or(LoginRedirect)?;
        let user = validate_session(state, &raw_token).map_err(|e| {
            tracing::debug!("Page session rejected: {e:?}");
            LoginRedirect
        })?;
        Ok(PageUser { user })
    }
}
