//! Auth routes: login, registration, logout, and the session cookie.
//!
//! The access token issued by the hosted identity API is kept in an HttpOnly
//! `access_token` cookie. Every request turns that cookie into a
//! [`SessionContext`]; nothing about the session is stored server-side.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::backend::{AuthSession, BackendError, SessionContext};
use crate::services::account::{self, AccountError, RegisterForm, RegisterOutcome};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "access_token";

// =============================================================================
// SESSION EXTRACTOR
// =============================================================================

/// Caller session from the `access_token` cookie. Never rejects: a missing
/// or blank cookie is an anonymous session.
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(jar
            .get(COOKIE_NAME)
            .map_or_else(Self::anonymous, |c| Self::with_token(c.value())))
    }
}

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(session: &AuthSession, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((COOKIE_NAME, session.access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    if let Some(secs) = session.expires_in.and_then(|s| i64::try_from(s).ok()) {
        cookie.set_max_age(Duration::seconds(secs));
    }
    cookie
}

pub(crate) fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// ERRORS
// =============================================================================

pub(crate) fn account_error_to_status(err: &AccountError) -> StatusCode {
    match err {
        AccountError::InvalidEmail | AccountError::EmptyPassword | AccountError::EmptyName => StatusCode::BAD_REQUEST,
        AccountError::SignIn(BackendError::Status { status, .. }) if *status < 500 => StatusCode::UNAUTHORIZED,
        AccountError::SignUp(BackendError::Status { status, .. }) if *status < 500 => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AccountError::MissingProfile(_) => StatusCode::FORBIDDEN,
        AccountError::SignIn(_) | AccountError::SignUp(_) | AccountError::Profile(_) => StatusCode::BAD_GATEWAY,
    }
}

fn account_error_response(err: &AccountError) -> Response {
    let status = account_error_to_status(err);
    let message = match err {
        AccountError::SignIn(e) | AccountError::SignUp(e) => e.user_message().to_owned(),
        other => other.to_string(),
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "account request failed");
    }
    (status, Json(json!({ "error": message }))).into_response()
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginBody {
    email: String,
    password: String,
}

/// `POST /api/auth/login`: sign in, set the cookie, answer with the role home.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Response {
    match account::login(state.sessions.as_ref(), state.profiles.as_ref(), &body.email, &body.password).await {
        Ok(outcome) => {
            let jar = CookieJar::new().add(session_cookie(&outcome.session, state.cookie_secure));
            let body = json!({ "role": outcome.role, "redirect_to": outcome.home });
            (jar, Json(body)).into_response()
        }
        Err(e) => account_error_response(&e),
    }
}

/// `POST /api/auth/register`: create a customer account.
pub async fn register(State(state): State<AppState>, Json(form): Json<RegisterForm>) -> Response {
    match account::register(state.sessions.as_ref(), state.profiles.as_ref(), form).await {
        Ok(RegisterOutcome::SignedIn(session)) => {
            let jar = CookieJar::new().add(session_cookie(&session, state.cookie_secure));
            let body = json!({ "status": "signed_in", "redirect_to": crate::guard::route::CUSTOMER_HOME });
            (StatusCode::CREATED, jar, Json(body)).into_response()
        }
        Ok(RegisterOutcome::PendingVerification(user)) => {
            let body = json!({ "status": "verify_email", "user_id": user.id });
            (StatusCode::ACCEPTED, Json(body)).into_response()
        }
        Err(e) => account_error_response(&e),
    }
}

/// `POST /api/auth/logout`: revoke remotely (best effort) and clear the cookie.
pub async fn logout(State(state): State<AppState>, session: SessionContext) -> impl IntoResponse {
    if let Err(e) = state.sessions.sign_out(&session).await {
        tracing::warn!(error = %e, "remote sign-out failed; clearing cookie anyway");
    }
    let jar = CookieJar::new().add(cleared_cookie(state.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`: current user and profile.
pub async fn me(State(state): State<AppState>, session: SessionContext) -> Result<Json<account::AccountView>, StatusCode> {
    match account::current_account(state.sessions.as_ref(), state.profiles.as_ref(), &session).await {
        Ok(Some(view)) => Ok(Json(view)),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!(error = %e, "me: backend request failed");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
