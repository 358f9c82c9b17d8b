//! Backend types: identity, profile and package records plus the trait seams
//! the rest of the service talks to.
//!
//! Every call takes a [`SessionContext`] so the hosted store applies its
//! row-level security to the caller's own token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by hosted-backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("backend request failed: {0}")]
    Transport(String),

    /// The backend returned a non-success status.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("backend response parse failed: {0}")]
    Parse(String),

    /// A profile row carried a role outside `admin` / `customer`.
    #[error("unknown role {0:?}")]
    UnknownRole(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl BackendError {
    /// Message suitable for showing next to a form (credentials rejected, etc.).
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::UnknownRole(_) => "unknown role",
            Self::Transport(_) | Self::Parse(_) | Self::HttpClientBuild(_) => "backend unavailable",
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Caller-scoped session: the access token presented with this request or
/// navigation, if any. Built per request, never stored globally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    access_token: Option<String>,
}

impl SessionContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { access_token: None }
    }

    /// Blank tokens are treated as no token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.trim().is_empty() { Self::anonymous() } else { Self { access_token: Some(token) } }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.access_token.is_none()
    }
}

/// Identity resolved by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Sign-up either signs the user in straight away or waits for email
/// confirmation, depending on how the backend project is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    Session(AuthSession),
    PendingConfirmation(AuthUser),
}

impl SignUpOutcome {
    #[must_use]
    pub fn user(&self) -> &AuthUser {
        match self {
            Self::Session(session) => &session.user,
            Self::PendingConfirmation(user) => user,
        }
    }
}

// =============================================================================
// PROFILE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
        }
    }

    /// Parse a stored role value. Anything other than the two known roles is
    /// an error rather than a guessed default.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnknownRole`] for unrecognised values.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        match raw {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            other => Err(BackendError::UnknownRole(other.to_string())),
        }
    }
}

/// A registered user's profile row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub birthdate: Option<String>,
    pub branch: Option<String>,
    pub locker_address: Option<String>,
}

/// Wire shape of a `profiles` row; `role` is still a raw string here.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRow {
    pub id: Uuid,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub locker_address: Option<String>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = BackendError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            role: Role::parse(&row.role)?,
            name: row.name,
            email: row.email,
            avatar_url: row.avatar_url,
            phone: row.phone,
            id_number: row.id_number,
            birthdate: row.birthdate,
            branch: row.branch,
            locker_address: row.locker_address,
        })
    }
}

/// Profile inserted at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub birthdate: Option<String>,
    pub branch: Option<String>,
}

// =============================================================================
// PACKAGE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    #[serde(alias = "received")]
    Pending,
    InTransit,
    Delivered,
}

impl PackageStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
        }
    }
}

/// A tracked package row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tracking_number: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    pub status: PackageStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub received_at_miami: Option<String>,
    #[serde(default)]
    pub received_at_branch: Option<String>,
}

/// Package inserted by an admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPackage {
    pub user_id: Uuid,
    pub tracking_number: String,
    pub weight: f64,
    pub price: f64,
    pub status: PackageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at_miami: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at_branch: Option<String>,
}

/// Row filter for package listings and counts. Empty means every row the
/// caller can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<PackageStatus>,
}

impl PackageFilter {
    #[must_use]
    pub fn for_user(user_id: Uuid) -> Self {
        Self { user_id: Some(user_id), status: None }
    }

    #[must_use]
    pub fn with_status(mut self, status: PackageStatus) -> Self {
        self.status = Some(status);
        self
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Remote identity API.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve the user behind the session. `Ok(None)` when there is no token
    /// or the backend rejects it.
    async fn current_user(&self, session: &SessionContext) -> Result<Option<AuthUser>, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError>;

    async fn sign_out(&self, session: &SessionContext) -> Result<(), BackendError>;
}

/// Remote `profiles` table.
#[async_trait::async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Role of the given user, `Ok(None)` when no profile row exists.
    async fn get_role(&self, session: &SessionContext, user_id: Uuid) -> Result<Option<Role>, BackendError>;

    async fn get_profile(&self, session: &SessionContext, user_id: Uuid) -> Result<Option<Profile>, BackendError>;

    /// Every profile visible to the caller.
    async fn list_profiles(&self, session: &SessionContext) -> Result<Vec<Profile>, BackendError>;

    async fn insert_profile(&self, session: &SessionContext, profile: &NewProfile) -> Result<(), BackendError>;
}

/// Remote `packages` table.
#[async_trait::async_trait]
pub trait PackageStore: Send + Sync {
    /// Matching packages, newest first.
    async fn list_packages(&self, session: &SessionContext, filter: PackageFilter) -> Result<Vec<Package>, BackendError>;

    async fn count_packages(&self, session: &SessionContext, filter: PackageFilter) -> Result<u64, BackendError>;

    async fn insert_package(&self, session: &SessionContext, package: &NewPackage) -> Result<Package, BackendError>;

    /// Returns `false` when no row matched.
    async fn update_status(
        &self,
        session: &SessionContext,
        package_id: Uuid,
        status: PackageStatus,
    ) -> Result<bool, BackendError>;

    /// Returns `false` when no row matched.
    async fn delete_package(&self, session: &SessionContext, package_id: Uuid) -> Result<bool, BackendError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
