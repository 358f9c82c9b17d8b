//! Package service: customer summaries and admin package management.
//!
//! DESIGN
//! ======
//! All reads and writes go through [`PackageStore`] with the caller's own
//! session, so the hosted store's row-level security decides what a customer
//! can see. The guard has already decided which area the caller may reach;
//! this module does not re-check roles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{BackendError, NewPackage, Package, PackageFilter, PackageStatus, PackageStore, SessionContext};

/// Packages shown on the customer dashboard.
pub const RECENT_LIMIT: usize = 5;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("invalid package: {0}")]
    Invalid(&'static str),
    #[error("package not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackageCounts {
    pub total: usize,
    pub in_transit: usize,
    pub delivered: usize,
}

impl PackageCounts {
    #[must_use]
    pub fn of(packages: &[Package]) -> Self {
        let with = |status: PackageStatus| packages.iter().filter(|p| p.status == status).count();
        Self {
            total: packages.len(),
            in_transit: with(PackageStatus::InTransit),
            delivered: with(PackageStatus::Delivered),
        }
    }
}

/// Customer dashboard numbers plus the newest packages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub counts: PackageCounts,
    pub recent: Vec<Package>,
}

/// A package with the human-readable place it is waiting at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedPackage {
    #[serde(flatten)]
    pub package: Package,
    pub location: &'static str,
}

/// Admin overview totals across every package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub total: u64,
    pub pending: u64,
    pub in_transit: u64,
    pub delivered: u64,
}

/// Admin create-package request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackage {
    pub user_id: Uuid,
    pub tracking_number: String,
    pub weight: f64,
    pub price: f64,
    #[serde(default)]
    pub status: Option<PackageStatus>,
    #[serde(default)]
    pub received_at_miami: Option<String>,
    #[serde(default)]
    pub received_at_branch: Option<String>,
}

/// Listing filters from the query string: `?status=in_transit&q=trk`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<PackageStatus>,
    #[serde(default)]
    pub q: Option<String>,
}

impl ListQuery {
    fn filter(&self, base: PackageFilter) -> PackageFilter {
        PackageFilter { status: self.status, ..base }
    }

    /// Case-insensitive tracking-number search. A blank term matches all.
    #[must_use]
    pub fn matches_search(&self, tracking_number: &str) -> bool {
        match self.q.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => tracking_number.to_lowercase().contains(&term.to_lowercase()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// CUSTOMER
// =============================================================================

#[must_use]
pub fn location_label(package: &Package) -> &'static str {
    if package.received_at_branch.is_some() { "branch" } else { "miami warehouse" }
}

/// Counts and newest packages for one customer, from a single listing.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn customer_summary(
    store: &dyn PackageStore,
    session: &SessionContext,
    user_id: Uuid,
) -> Result<CustomerSummary, PackageError> {
    let mut packages = store
        .list_packages(session, PackageFilter::for_user(user_id))
        .await?;
    let counts = PackageCounts::of(&packages);
    packages.truncate(RECENT_LIMIT);
    Ok(CustomerSummary { counts, recent: packages })
}

/// Packages of one customer, newest first, with their location. The status
/// filter runs in the store; the search runs here.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn customer_packages(
    store: &dyn PackageStore,
    session: &SessionContext,
    user_id: Uuid,
    query: &ListQuery,
) -> Result<Vec<TrackedPackage>, PackageError> {
    let packages = store
        .list_packages(session, query.filter(PackageFilter::for_user(user_id)))
        .await?;
    Ok(packages
        .into_iter()
        .filter(|p| query.matches_search(&p.tracking_number))
        .map(|package| TrackedPackage { location: location_label(&package), package })
        .collect())
}

// =============================================================================
// ADMIN
// =============================================================================

/// Per-status counts over all packages.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn status_totals(store: &dyn PackageStore, session: &SessionContext) -> Result<StatusTotals, PackageError> {
    let all = PackageFilter::default();
    let (total, pending, in_transit, delivered) = futures::try_join!(
        store.count_packages(session, all),
        store.count_packages(session, all.with_status(PackageStatus::Pending)),
        store.count_packages(session, all.with_status(PackageStatus::InTransit)),
        store.count_packages(session, all.with_status(PackageStatus::Delivered)),
    )?;
    Ok(StatusTotals { total, pending, in_transit, delivered })
}

/// Every package matching the listing filters, newest first.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn all_packages(
    store: &dyn PackageStore,
    session: &SessionContext,
    query: &ListQuery,
) -> Result<Vec<Package>, PackageError> {
    let mut packages = store
        .list_packages(session, query.filter(PackageFilter::default()))
        .await?;
    packages.retain(|p| query.matches_search(&p.tracking_number));
    Ok(packages)
}

/// Check a create request and turn it into an insertable row.
///
/// # Errors
///
/// Returns [`PackageError::Invalid`] for a blank tracking number, a
/// non-positive weight or a negative price.
pub fn validate(request: CreatePackage) -> Result<NewPackage, PackageError> {
    let tracking_number = request.tracking_number.trim().to_owned();
    if tracking_number.is_empty() {
        return Err(PackageError::Invalid("tracking number is required"));
    }
    if !request.weight.is_finite() || request.weight <= 0.0 {
        return Err(PackageError::Invalid("weight must be greater than zero"));
    }
    if !request.price.is_finite() || request.price < 0.0 {
        return Err(PackageError::Invalid("price must not be negative"));
    }
    Ok(NewPackage {
        user_id: request.user_id,
        tracking_number,
        weight: request.weight,
        price: request.price,
        status: request.status.unwrap_or(PackageStatus::Pending),
        received_at_miami: non_blank(request.received_at_miami),
        received_at_branch: non_blank(request.received_at_branch),
    })
}

/// # Errors
///
/// Fails validation or propagates backend failures.
pub async fn create_package(
    store: &dyn PackageStore,
    session: &SessionContext,
    request: CreatePackage,
) -> Result<Package, PackageError> {
    let row = validate(request)?;
    let package = store.insert_package(session, &row).await?;
    tracing::info!(package_id = %package.id, user_id = %package.user_id, "packages: created");
    Ok(package)
}

/// # Errors
///
/// [`PackageError::NotFound`] when no row matched.
pub async fn set_status(
    store: &dyn PackageStore,
    session: &SessionContext,
    package_id: Uuid,
    status: PackageStatus,
) -> Result<(), PackageError> {
    if store.update_status(session, package_id, status).await? {
        tracing::info!(%package_id, status = status.as_str(), "packages: status updated");
        Ok(())
    } else {
        Err(PackageError::NotFound(package_id))
    }
}

/// # Errors
///
/// [`PackageError::NotFound`] when no row matched.
pub async fn remove_package(
    store: &dyn PackageStore,
    session: &SessionContext,
    package_id: Uuid,
) -> Result<(), PackageError> {
    if store.delete_package(session, package_id).await? {
        tracing::info!(%package_id, "packages: deleted");
        Ok(())
    } else {
        Err(PackageError::NotFound(package_id))
    }
}

#[cfg(test)]
#[path = "packages_test.rs"]
mod tests;
