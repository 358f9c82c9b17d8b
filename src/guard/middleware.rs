//! Axum middleware: one guard evaluation per page request.
//!
//! `Render` passes the request through with the [`Viewer`] attached as an
//! extension; `Redirect` answers `303 See Other` and the page handler never
//! runs. A redirect back to the requested path (a signed-in user with no
//! usable role on `/login`) also clears the session cookie, so the follow-up
//! request arrives anonymous and renders.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use super::decision::{Outcome, Viewer, evaluate};
use super::route::normalize;
use crate::backend::SessionContext;
use crate::routes::auth::cleared_cookie;
use crate::state::AppState;

pub async fn route_guard(State(state): State<AppState>, session: SessionContext, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let verdict = evaluate(state.sessions.as_ref(), state.profiles.as_ref(), &session, &path).await;

    match verdict.outcome {
        Outcome::Render => {
            if let Some(viewer) = verdict.viewer {
                req.extensions_mut().insert(viewer);
            }
            next.run(req).await
        }
        Outcome::Redirect(target) => {
            if target == normalize(&verdict.path) {
                tracing::debug!(path = %verdict.path, "guard: dropping unusable session cookie");
                let jar = CookieJar::new().add(cleared_cookie(state.cookie_secure));
                return (jar, Redirect::to(target)).into_response();
            }
            tracing::debug!(path = %verdict.path, class = ?verdict.class, %target, "guard: redirecting request");
            Redirect::to(target).into_response()
        }
    }
}

/// Signed-in viewer of a guarded page. Rejects with 401 when the guard did
/// not attach one (route mounted outside the guard, or anonymous on login).
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
#[path = "middleware_test.rs"]
mod tests;
