//! Page routes: JSON view models for the customer and admin areas.
//!
//! Every handler here is mounted behind the route guard, so a [`Viewer`] is
//! always attached and the role already matches the area. Data is fetched
//! with the viewer's own session.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{BackendError, Package, PackageStatus, Profile, Role};
use crate::guard::{Viewer, home_for};
use crate::services::clients::{self, ClientSummary};
use crate::services::packages::{
    self, CreatePackage, CustomerSummary, ListQuery, PackageError, StatusTotals, TrackedPackage,
};
use crate::state::AppState;

pub(crate) fn package_error_to_status(err: &PackageError) -> StatusCode {
    match err {
        PackageError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PackageError::NotFound(_) => StatusCode::NOT_FOUND,
        PackageError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

fn package_failure(err: PackageError) -> StatusCode {
    let status = package_error_to_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "page data request failed");
    }
    status
}

fn backend_failure(err: BackendError) -> StatusCode {
    tracing::error!(error = %err, "page data request failed");
    StatusCode::BAD_GATEWAY
}

/// First word of the profile name, else the local part of the email.
#[must_use]
pub fn first_name(profile: Option<&Profile>, fallback_email: Option<&str>) -> String {
    profile
        .and_then(|p| p.name.as_deref())
        .and_then(|name| name.split_whitespace().next())
        .or_else(|| {
            profile
                .and_then(|p| p.email.as_deref())
                .or(fallback_email)
                .and_then(|email| email.split('@').next())
        })
        .unwrap_or_default()
        .to_owned()
}

// =============================================================================
// SHARED
// =============================================================================

#[derive(Serialize)]
pub struct HomeView {
    pub role: Role,
    pub home: &'static str,
}

/// `GET /`
pub async fn home(viewer: Viewer) -> Json<HomeView> {
    Json(HomeView { role: viewer.role, home: home_for(viewer.role) })
}

#[derive(Serialize)]
pub struct LoginView {
    pub login: &'static str,
    pub register: &'static str,
}

/// `GET /login`: only reached by anonymous callers.
pub async fn login() -> Json<LoginView> {
    Json(LoginView { login: "/api/auth/login", register: "/api/auth/register" })
}

// =============================================================================
// CUSTOMER
// =============================================================================

#[derive(Serialize)]
pub struct DashboardView {
    pub profile: Option<Profile>,
    pub greeting: String,
    #[serde(flatten)]
    pub summary: CustomerSummary,
}

/// `GET /dashboard`
pub async fn dashboard(State(state): State<AppState>, viewer: Viewer) -> Result<Json<DashboardView>, StatusCode> {
    let (profile, summary) = futures::try_join!(
        async {
            state
                .profiles
                .get_profile(&viewer.session, viewer.user.id)
                .await
                .map_err(backend_failure)
        },
        async {
            packages::customer_summary(state.packages.as_ref(), &viewer.session, viewer.user.id)
                .await
                .map_err(package_failure)
        },
    )?;
    let greeting = first_name(profile.as_ref(), viewer.user.email.as_deref());
    Ok(Json(DashboardView { profile, greeting, summary }))
}

/// `GET /dashboard/packages` and `GET /packages`, with optional `status`
/// and `q` filters.
pub async fn customer_packages(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TrackedPackage>>, StatusCode> {
    packages::customer_packages(state.packages.as_ref(), &viewer.session, viewer.user.id, &query)
        .await
        .map(Json)
        .map_err(package_failure)
}

// =============================================================================
// ADMIN
// =============================================================================

#[derive(Serialize)]
pub struct AdminOverview {
    pub packages: StatusTotals,
    pub customers: usize,
}

/// `GET /admin`
pub async fn admin_overview(State(state): State<AppState>, viewer: Viewer) -> Result<Json<AdminOverview>, StatusCode> {
    let (totals, customers) = futures::try_join!(
        async {
            packages::status_totals(state.packages.as_ref(), &viewer.session)
                .await
                .map_err(package_failure)
        },
        async {
            clients::customers(state.profiles.as_ref(), &viewer.session)
                .await
                .map_err(backend_failure)
        },
    )?;
    Ok(Json(AdminOverview { packages: totals, customers: customers.len() }))
}

/// `GET /admin/clients`
pub async fn admin_clients(State(state): State<AppState>, viewer: Viewer) -> Result<Json<Vec<ClientSummary>>, StatusCode> {
    clients::list_clients(state.profiles.as_ref(), state.packages.as_ref(), &viewer.session)
        .await
        .map(Json)
        .map_err(backend_failure)
}

/// `GET /admin/packages`, with optional `status` and `q` filters.
pub async fn admin_packages(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Package>>, StatusCode> {
    packages::all_packages(state.packages.as_ref(), &viewer.session, &query)
        .await
        .map(Json)
        .map_err(package_failure)
}

/// `POST /admin/packages`
pub async fn create_package(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(body): Json<CreatePackage>,
) -> Result<(StatusCode, Json<Package>), StatusCode> {
    packages::create_package(state.packages.as_ref(), &viewer.session, body)
        .await
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(package_failure)
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: PackageStatus,
}

/// `PATCH /admin/packages/{id}`
pub async fn update_package(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<StatusCode, StatusCode> {
    packages::set_status(state.packages.as_ref(), &viewer.session, id, body.status)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(package_failure)
}

/// `DELETE /admin/packages/{id}`
pub async fn delete_package(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    packages::remove_package(state.packages.as_ref(), &viewer.session, id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(package_failure)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
