use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use super::session::{SESSION_COOKIE, hash_token, validate_token_format};
use crate::server::AppState;
use crate::types::User;

#[derive(Debug)]
pub enum SessionValidationError {
    InvalidToken,
    SessionExpired,
    InactiveUser,
    InternalError,
}

/// Extracts the raw session token, preferring a Bearer header over the cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string())
        })
}

/// Validates a raw session token against the store.
/// Returns the active user the session belongs to.
pub fn validate_session(
    state: &Arc<AppState>,
    raw_token: &str,
) -> Result<User, SessionValidationError> {
    validate_token_format(raw_token).map_err(|_| SessionValidationError::InvalidToken)?;

    let session = state
        .store
        .get_session_by_token_hash(&hash_token(raw_token))
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidToken)?;

    if session.expires_at <= Utc::now() {
        if let Err(e) = state.store.delete_session(&session.id) {
            tracing::warn!("Failed to delete expired session: {e}");
        }
        return Err(SessionValidationError::SessionExpired);
    }

    let user = state
        .store
        .get_user(session.user_id)
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidToken)?;

    if !user.is_active {
        return Err(SessionValidationError::InactiveUser);
    }

    Ok(user)
}
