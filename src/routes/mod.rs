//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Page routes sit behind the route guard middleware; a page handler only
//! runs when the guard answers `Render`. Auth endpoints, the navigation
//! websocket and `/healthz` are unguarded: they take the session as-is.

pub mod auth;
pub mod nav;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, patch, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::guard::middleware::route_guard;
use crate::state::AppState;

/// Guarded page routes.
fn page_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/packages", get(pages::customer_packages))
        .route("/packages", get(pages::customer_packages))
        .route("/admin", get(pages::admin_overview))
        .route("/admin/clients", get(pages::admin_clients))
        .route("/admin/packages", get(pages::admin_packages).post(pages::create_package))
        .route(
            "/admin/packages/{id}",
            patch(pages::update_package).delete(pages::delete_package),
        )
        .route_layer(middleware::from_fn_with_state(state, route_guard))
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(page_routes(state.clone()))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/nav", get(nav::handle_nav))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
