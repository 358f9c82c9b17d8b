//! Client service: customer roster for the admin area.

use futures::future::try_join_all;
use serde::Serialize;

use crate::backend::{
    BackendError, PackageFilter, PackageStatus, PackageStore, Profile, ProfileLookup, Role, SessionContext,
};

/// A customer profile with the number of packages currently on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub profile: Profile,
    pub in_transit: u64,
}

/// Every customer profile. Admin profiles are left out.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn customers(profiles: &dyn ProfileLookup, session: &SessionContext) -> Result<Vec<Profile>, BackendError> {
    let mut rows = profiles.list_profiles(session).await?;
    rows.retain(|p| p.role == Role::Customer);
    Ok(rows)
}

/// Customers with their in-transit counts. Counts are fetched concurrently;
/// one failed count fails the whole listing.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn list_clients(
    profiles: &dyn ProfileLookup,
    packages: &dyn PackageStore,
    session: &SessionContext,
) -> Result<Vec<ClientSummary>, BackendError> {
    let rows = customers(profiles, session).await?;
    let counts = try_join_all(rows.iter().map(|p| {
        packages.count_packages(session, PackageFilter::for_user(p.id).with_status(PackageStatus::InTransit))
    }))
    .await?;

    Ok(rows
        .into_iter()
        .zip(counts)
        .map(|(profile, in_transit)| ClientSummary { profile, in_transit })
        .collect())
}

#[cfg(test)]
#[path = "clients_test.rs"]
mod tests;
