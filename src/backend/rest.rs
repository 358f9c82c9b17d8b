//! REST endpoint client (`/rest/v1`) for the `profiles` and `packages` tables.
//!
//! Filters use the endpoint's `column=op.value` query syntax. Writes ask for
//! `return=representation` so an empty array tells us nothing matched.

use uuid::Uuid;

use super::types::{
    BackendError, NewPackage, NewProfile, Package, PackageFilter, PackageStatus, PackageStore, Profile, ProfileLookup,
    ProfileRow, Role, SessionContext,
};
use super::{BackendClient, send, status_error};

const PROFILE_COLUMNS: &str = "id,role,name,email,avatar_url,phone,id_number,birthdate,branch,locker_address";

// =============================================================================
// PROFILES
// =============================================================================

#[async_trait::async_trait]
impl ProfileLookup for BackendClient {
    async fn get_role(&self, session: &SessionContext, user_id: Uuid) -> Result<Option<Role>, BackendError> {
        let req = self
            .authorize(self.http.get(self.rest_url("profiles")), session)
            .query(&[("select", "role".to_string()), ("id", eq(user_id)), ("limit", "1".to_string())]);
        let (status, body) = send(req).await?;
        parse_role_rows(status, &body)
    }

    async fn get_profile(&self, session: &SessionContext, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
        let req = self
            .authorize(self.http.get(self.rest_url("profiles")), session)
            .query(&[("select", PROFILE_COLUMNS.to_string()), ("id", eq(user_id)), ("limit", "1".to_string())]);
        let (status, body) = send(req).await?;
        Ok(parse_profile_rows(status, &body)?.into_iter().next())
    }

    async fn list_profiles(&self, session: &SessionContext) -> Result<Vec<Profile>, BackendError> {
        let req = self
            .authorize(self.http.get(self.rest_url("profiles")), session)
            .query(&[("select", PROFILE_COLUMNS), ("order", "name.asc")]);
        let (status, body) = send(req).await?;
        parse_profile_rows(status, &body)
    }

    async fn insert_profile(&self, session: &SessionContext, profile: &NewProfile) -> Result<(), BackendError> {
        let req = self
            .authorize(self.http.post(self.rest_url("profiles")), session)
            .header("Prefer", "return=minimal")
            .json(&[profile]);
        let (status, body) = send(req).await?;
        if (200..300).contains(&status) { Ok(()) } else { Err(status_error(status, &body)) }
    }
}

// =============================================================================
// PACKAGES
// =============================================================================

#[async_trait::async_trait]
impl PackageStore for BackendClient {
    async fn list_packages(&self, session: &SessionContext, filter: PackageFilter) -> Result<Vec<Package>, BackendError> {
        let mut query = filter_query(filter);
        query.push(("select", "*".to_string()));
        query.push(("order", "created_at.desc".to_string()));
        let req = self
            .authorize(self.http.get(self.rest_url("packages")), session)
            .query(&query);
        let (status, body) = send(req).await?;
        parse_rows::<Package>(status, &body)
    }

    async fn count_packages(&self, session: &SessionContext, filter: PackageFilter) -> Result<u64, BackendError> {
        let mut query = filter_query(filter);
        query.push(("select", "id".to_string()));
        let response = self
            .authorize(self.http.head(self.rest_url("packages")), session)
            .header("Prefer", "count=exact")
            .query(&query)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(BackendError::Status { status, message: "count request rejected".into() });
        }
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BackendError::Parse("missing content-range header".into()))?;
        parse_content_range_total(range)
    }

    async fn insert_package(&self, session: &SessionContext, package: &NewPackage) -> Result<Package, BackendError> {
        let req = self
            .authorize(self.http.post(self.rest_url("packages")), session)
            .header("Prefer", "return=representation")
            .json(&[package]);
        let (status, body) = send(req).await?;
        parse_rows::<Package>(status, &body)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("insert returned no rows".into()))
    }

    async fn update_status(
        &self,
        session: &SessionContext,
        package_id: Uuid,
        status: PackageStatus,
    ) -> Result<bool, BackendError> {
        let req = self
            .authorize(self.http.patch(self.rest_url("packages")), session)
            .header("Prefer", "return=representation")
            .query(&[("id", eq(package_id))])
            .json(&serde_json::json!({ "status": status }));
        let (code, body) = send(req).await?;
        Ok(!parse_rows::<Package>(code, &body)?.is_empty())
    }

    async fn delete_package(&self, session: &SessionContext, package_id: Uuid) -> Result<bool, BackendError> {
        let req = self
            .authorize(self.http.delete(self.rest_url("packages")), session)
            .header("Prefer", "return=representation")
            .query(&[("id", eq(package_id))]);
        let (status, body) = send(req).await?;
        Ok(!parse_rows::<Package>(status, &body)?.is_empty())
    }
}

// =============================================================================
// QUERY + PARSING
// =============================================================================

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

pub(crate) fn filter_query(filter: PackageFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(user_id) = filter.user_id {
        query.push(("user_id", eq(user_id)));
    }
    if let Some(status) = filter.status {
        query.push(("status", eq(status.as_str())));
    }
    query
}

pub(crate) fn parse_rows<T: serde::de::DeserializeOwned>(status: u16, body: &str) -> Result<Vec<T>, BackendError> {
    if !(200..300).contains(&status) {
        return Err(status_error(status, body));
    }
    serde_json::from_str::<Vec<T>>(body).map_err(|e| BackendError::Parse(e.to_string()))
}

pub(crate) fn parse_profile_rows(status: u16, body: &str) -> Result<Vec<Profile>, BackendError> {
    parse_rows::<ProfileRow>(status, body)?
        .into_iter()
        .map(Profile::try_from)
        .collect()
}

#[derive(serde::Deserialize)]
struct RoleRow {
    role: String,
}

pub(crate) fn parse_role_rows(status: u16, body: &str) -> Result<Option<Role>, BackendError> {
    parse_rows::<RoleRow>(status, body)?
        .into_iter()
        .next()
        .map(|row| Role::parse(&row.role))
        .transpose()
}

/// Total from a `Content-Range` header such as `0-24/312` or `*/0`.
pub(crate) fn parse_content_range_total(raw: &str) -> Result<u64, BackendError> {
    raw.rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .ok_or_else(|| BackendError::Parse(format!("unexpected content-range: {raw}")))
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
