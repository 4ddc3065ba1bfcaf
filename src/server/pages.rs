use std::sync::Arc;

use axum::Form;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use super::AppState;
use super::dto::{LoginForm, LoginQuery, RegisterForm};
use super::html::RegisterValues;
use crate::auth::{PageUser, SESSION_COOKIE, extract_session_token};
use crate::error::{Error, Result};
use crate::service::accounts::{self, Registration};
use crate::service::dashboard;

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/platform")
}

/// GET /register
pub async fn register_form(State(state): State<Arc<AppState>>) -> Response {
    render(state.pages.register(None, &RegisterValues::default()))
}

/// POST /register
pub async fn register(State(state): State<Arc<AppState>>, Form(form): Form<RegisterForm>) -> Response {
    let input = Registration {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email: form.email.clone(),
        password: form.password,
        password_confirm: form.password_confirm,
        is_staff: false,
    };

    match accounts::register(state.store.as_ref(), &state.hasher, &input) {
        Ok(_) => Redirect::to("/login?registered=1").into_response(),
        Err(e) => {
            let values = RegisterValues {
                first_name: &form.first_name,
                last_name: &form.last_name,
                email: &form.email,
            };
            page_error(e, |message| state.pages.register(Some(message), &values))
        }
    }
}

/// GET /login
pub async fn login_form(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let notice = query
        .registered
        .is_some()
        .then_some("Account created. You can sign in now.");
    render(state.pages.login(None, notice, ""))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = accounts::login(
        state.store.as_ref(),
        &state.hasher,
        &form.email,
        &form.password,
        state.config.session_ttl(),
    );

    match result {
        Ok((_, raw_token)) => {
            let cookie = Cookie::build((SESSION_COOKIE, raw_token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.config.secure_cookies);
            (jar.add(cookie), Redirect::to("/platform")).into_response()
        }
        Err(e) => page_error(e, |message| state.pages.login(Some(message), None, &form.email)),
    }
}

/// GET /logout
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap, jar: CookieJar) -> Response {
    let raw_token = extract_session_token(&headers);
    if let Err(e) = accounts::logout(state.store.as_ref(), raw_token.as_deref()) {
        tracing::warn!("Failed to end session: {e}");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login")).into_response()
}

/// GET /platform
pub async fn platform(auth: PageUser, State(state): State<Arc<AppState>>) -> Response {
    let page = dashboard::load(
        state.store.as_ref(),
        state.storage.as_ref(),
        &auth.user,
        Utc::now(),
    )
    .and_then(|data| state.pages.dashboard(&data));
    render(page)
}

fn render(page: Result<String>) -> Response {
    match page {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Re-renders a form with the error message. Internal failures are logged
/// and shown generically.
fn page_error(e: Error, form: impl FnOnce(&str) -> Result<String>) -> Response {
    let status = match e {
        Error::Validation(_) | Error::Conflict(_) | Error::InvalidCredentials => {
            StatusCode::BAD_REQUEST
        }
        ref other => {
            tracing::error!("Request failed: {other}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = if status == StatusCode::BAD_REQUEST {
        e.to_string()
    } else {
        "Something went wrong, please try again.".to_string()
    };
    match form(&message) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(render_error) => {
            tracing::error!("Failed to render page: {render_error}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
