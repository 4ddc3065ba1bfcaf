use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Session;

pub const SESSION_COOKIE: &str = "docvault_session";

const TOKEN_PREFIX: &str = "dv";
const SECRET_BYTES: usize = 32;

/// Generates a new session for `user_id`.
/// Returns the session row to persist and the raw token for the cookie.
pub fn new_session(user_id: i64, ttl: Duration, now: DateTime<Utc>) -> (Session, String) {
    let raw_token = generate_token();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        token_hash: hash_token(&raw_token),
        user_id,
        created_at: now,
        expires_at: now + ttl,
    };
    (session, raw_token)
}

/// Builds a token with the format: dv_<64 hex chars>
#[must_use]
fn generate_token() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    format!("{TOKEN_PREFIX}_{}", hex::encode(bytes))
}

/// The digest stored in the database in place of the token.
#[must_use]
pub fn hash_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// Checks the shape of a token before touching the database.
pub fn validate_token_format(token: &str) -> Result<()> {
    let secret = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or(Error::Unauthorized)?;

    if secret.len() != SECRET_BYTES * 2 || !secret.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Unauthorized);
    }

    Ok(())
}
