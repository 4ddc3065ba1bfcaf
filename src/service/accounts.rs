//! Registration, login and logout.

use chrono::Utc;

use crate::auth::PasswordHasher;
use crate::auth::session::{hash_token, new_session};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{NewUser, User};

/// Categories every new account starts with, as `(name, icon)`.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Invoices", "🧾"),
    ("Contracts", "📝"),
    ("Reports", "📊"),
    ("Certificates", "🎓"),
];

const MAX_NAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// When present it must equal `password`.
    pub password_confirm: Option<String>,
    pub is_staff: bool,
}

/// Creates an account together with its default categories.
/// The caller is not logged in.
pub fn register(store: &dyn Store, hasher: &PasswordHasher, input: &Registration) -> Result<User> {
    let first_name = required(&input.first_name, "First name")?;
    let last_name = required(&input.last_name, "Last name")?;
    let email = required(&input.email, "Email")?;

    for (label, value) in [("First name", first_name), ("Last name", last_name)] {
        if value.chars().count() > MAX_NAME_LEN {
            return Err(Error::validation(format!(
                "{label} must be at most {MAX_NAME_LEN} characters"
            )));
        }
    }
    validate_email(email)?;

    if input.password.is_empty() {
        return Err(Error::validation("Password is required"));
    }
    if let Some(confirm) = &input.password_confirm {
        if confirm != &input.password {
            return Err(Error::validation("Passwords do not match"));
        }
    }

    if store.get_user_by_email(email)?.is_some() {
        return Err(Error::conflict("A user with this email already exists"));
    }

    let new_user = NewUser {
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        password_hash: hasher.hash(&input.password)?,
        is_staff: input.is_staff,
    };

    let user = store.create_user(&new_user, DEFAULT_CATEGORIES)?;
    tracing::info!(user_id = user.id, "registered new account");
    Ok(user)
}

/// Authenticates by exact email (trimmed, as registration stores it) and password.
/// Returns the user and the raw session token to hand to the client.
pub fn login(
    store: &dyn Store,
    hasher: &PasswordHasher,
    email: &str,
    password: &str,
    ttl: chrono::Duration,
) -> Result<(User, String)> {
    let Some(user) = store.get_user_by_email(email.trim())? else {
        hasher.verify_dummy(password);
        return Err(Error::InvalidCredentials);
    };

    if !hasher.verify(password, &user.password_hash)? || !user.is_active {
        return Err(Error::InvalidCredentials);
    }

    let now = Utc::now();
    let purged = store.delete_expired_sessions(now)?;
    if purged > 0 {
        tracing::debug!(purged, "removed expired sessions");
    }

    let (session, raw_token) = new_session(user.id, ttl, now);
    store.create_session(&session)?;

    tracing::info!(user_id = user.id, "user logged in");
    Ok((user, raw_token))
}

/// Ends the session identified by `raw_token`. Unknown tokens are ignored.
pub fn logout(store: &dyn Store, raw_token: Option<&str>) -> Result<()> {
    let Some(raw_token) = raw_token else {
        return Ok(());
    };

    if let Some(session) = store.get_session_by_token_hash(&hash_token(raw_token))? {
        store.delete_session(&session.id)?;
        tracing::info!(user_id = session.user_id, "user logged out");
    }
    Ok(())
}

fn required<'a>(value: &'a str, label: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{label} is required")));
    }
    Ok(trimmed)
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.len() <= MAX_EMAIL_LEN
        && !email.chars().any(char::is_whitespace)
        && matches!(
            email.split_once('@'),
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        );

    if valid {
        Ok(())
    } else {
        Err(Error::validation("Enter a valid email address"))
    }
}
