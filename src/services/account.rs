//! Account service: sign-in, registration and the signed-in account view.
//!
//! DESIGN
//! ======
//! Both flows talk to the hosted identity API first and the `profiles` table
//! second. Login is only successful once the role is known, because the
//! caller is sent straight to that role's home page. Registration always
//! creates a `customer` profile; admins are promoted out of band.
//!
//! ERROR HANDLING
//! ==============
//! Input problems are rejected before any remote call. Remote failures keep
//! their [`BackendError`] as the source so handlers can tell rejected
//! credentials (4xx) from an unreachable backend.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::backend::{
    AuthSession, AuthUser, BackendError, NewProfile, Profile, ProfileLookup, Role, SessionContext, SessionProvider,
    SignUpOutcome,
};
use crate::guard::home_for;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("name must not be empty")]
    EmptyName,
    #[error("sign-in failed: {0}")]
    SignIn(#[source] BackendError),
    #[error("sign-up failed: {0}")]
    SignUp(#[source] BackendError),
    #[error("no profile for user {0}")]
    MissingProfile(Uuid),
    #[error("profile request failed: {0}")]
    Profile(#[source] BackendError),
}

/// Successful login: the new session and where to send the user.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: AuthSession,
    pub role: Role,
    pub home: &'static str,
}

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// The backend signed the new user in immediately.
    SignedIn(AuthSession),
    /// The backend wants the address confirmed first.
    PendingVerification(AuthUser),
}

/// Signed-in account as shown by `/api/auth/me`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub user: AuthUser,
    pub profile: Option<Profile>,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim and lower-case an address; it must hold exactly one `@` with
/// something on both sides.
///
/// # Errors
///
/// Returns [`AccountError::InvalidEmail`] otherwise.
pub fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim().to_ascii_lowercase();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccountError::InvalidEmail),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// FLOWS
// =============================================================================

/// Sign in and resolve the role with the fresh session.
///
/// # Errors
///
/// Fails on invalid input, rejected credentials, or when the role cannot be
/// read.
pub async fn login(
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileLookup,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, AccountError> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(AccountError::EmptyPassword);
    }

    let session = sessions
        .sign_in(&email, password)
        .await
        .map_err(AccountError::SignIn)?;
    let ctx = SessionContext::with_token(session.access_token.clone());
    let role = profiles
        .get_role(&ctx, session.user.id)
        .await
        .map_err(AccountError::Profile)?
        .ok_or(AccountError::MissingProfile(session.user.id))?;

    info!(user_id = %session.user.id, role = role.as_str(), "account: signed in");
    Ok(LoginOutcome { session, role, home: home_for(role) })
}

/// Create the identity, then its `customer` profile.
///
/// # Errors
///
/// Fails on invalid input, when the identity API refuses the sign-up, or
/// when the profile row cannot be written.
pub async fn register(
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileLookup,
    form: RegisterForm,
) -> Result<RegisterOutcome, AccountError> {
    let email = normalize_email(&form.email)?;
    if form.password.is_empty() {
        return Err(AccountError::EmptyPassword);
    }
    let name = form.name.trim().to_owned();
    if name.is_empty() {
        return Err(AccountError::EmptyName);
    }

    let outcome = sessions
        .sign_up(&email, &form.password)
        .await
        .map_err(AccountError::SignUp)?;
    let user = outcome.user().clone();
    let ctx = match &outcome {
        SignUpOutcome::Session(session) => SessionContext::with_token(session.access_token.clone()),
        SignUpOutcome::PendingConfirmation(_) => SessionContext::anonymous(),
    };

    let profile = NewProfile {
        id: user.id,
        email,
        role: Role::Customer,
        name,
        phone: non_blank(form.phone),
        id_number: non_blank(form.id_number),
        birthdate: non_blank(form.birthdate),
        branch: non_blank(form.branch),
    };
    profiles
        .insert_profile(&ctx, &profile)
        .await
        .map_err(AccountError::Profile)?;

    info!(user_id = %user.id, "account: registered");
    Ok(match outcome {
        SignUpOutcome::Session(session) => RegisterOutcome::SignedIn(session),
        SignUpOutcome::PendingConfirmation(user) => RegisterOutcome::PendingVerification(user),
    })
}

/// Current user plus profile, `Ok(None)` for an anonymous session.
///
/// # Errors
///
/// Propagates remote failures.
pub async fn current_account(
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileLookup,
    session: &SessionContext,
) -> Result<Option<AccountView>, BackendError> {
    let Some(user) = sessions.current_user(session).await? else {
        return Ok(None);
    };
    let profile = profiles.get_profile(session, user.id).await?;
    Ok(Some(AccountView { user, profile }))
}

#[cfg(test)]
#[path = "account_test.rs"]
mod tests;
