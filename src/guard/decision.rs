//! Guard decision: resolve who is asking, then pick render or redirect.
//!
//! ARCHITECTURE
//! ============
//! `evaluate` does the two remote round trips (current user, then role) and
//! folds the result into an [`Identity`]. `decide` is the pure matrix over
//! identity and route class, so every branch is testable without I/O.
//!
//! ERROR HANDLING
//! ==============
//! Failures never escape: they are logged and the identity degrades to
//! `Anonymous` (user unresolved) or `Unresolved` (role unknown), both of
//! which end at the login page rather than at protected content.

use tracing::{debug, warn};
use uuid::Uuid;

use super::route::{LOGIN_PATH, RouteClass, classify, home_for};
use crate::backend::{AuthUser, BackendError, ProfileLookup, Role, SessionContext, SessionProvider};

/// What the caller should do with the requested view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Render,
    Redirect(&'static str),
}

/// Failures swallowed at the guard boundary.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("could not resolve current user: {0}")]
    AuthResolution(#[source] BackendError),
    #[error("could not look up role for user {user_id}: {source}")]
    ProfileLookup {
        user_id: Uuid,
        #[source]
        source: BackendError,
    },
    #[error("no profile row for user {0}")]
    MissingProfile(Uuid),
}

/// Who is navigating, as far as the guard could tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No session, or the session could not be resolved.
    Anonymous,
    /// Signed in, but the role is unknown.
    Unresolved(AuthUser),
    Resolved { user: AuthUser, role: Role },
}

/// Signed-in user allowed through to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user: AuthUser,
    pub role: Role,
    pub session: SessionContext,
}

/// Result of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub path: String,
    pub class: RouteClass,
    pub outcome: Outcome,
    /// Present only when the outcome is `Render` and the role resolved.
    pub viewer: Option<Viewer>,
}

/// The decision matrix.
#[must_use]
pub fn decide(identity: &Identity, class: RouteClass) -> Outcome {
    match (identity, class) {
        (Identity::Anonymous, RouteClass::PublicLogin) => Outcome::Render,
        (Identity::Anonymous | Identity::Unresolved(_), _) => Outcome::Redirect(LOGIN_PATH),
        (Identity::Resolved { role: Role::Admin, .. }, RouteClass::CustomerArea) => Outcome::Redirect(home_for(Role::Admin)),
        (Identity::Resolved { role: Role::Customer, .. }, RouteClass::AdminArea) => {
            Outcome::Redirect(home_for(Role::Customer))
        }
        (Identity::Resolved { role, .. }, RouteClass::PublicLogin) => Outcome::Redirect(home_for(*role)),
        (Identity::Resolved { .. }, _) => Outcome::Render,
    }
}

/// Resolve the caller's identity. Stops after the first step when there is
/// no user; never retries.
pub async fn resolve_identity(
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileLookup,
    session: &SessionContext,
) -> Identity {
    let user = match sessions.current_user(session).await {
        Ok(Some(user)) => user,
        Ok(None) => return Identity::Anonymous,
        Err(e) => {
            warn!(error = %GuardError::AuthResolution(e), "guard: treating session as anonymous");
            return Identity::Anonymous;
        }
    };

    let failure = match profiles.get_role(session, user.id).await {
        Ok(Some(role)) => return Identity::Resolved { user, role },
        Ok(None) => GuardError::MissingProfile(user.id),
        Err(source) => GuardError::ProfileLookup { user_id: user.id, source },
    };
    warn!(error = %failure, "guard: role unresolved");
    Identity::Unresolved(user)
}

/// Run the full guard algorithm for one navigation.
pub async fn evaluate(
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileLookup,
    session: &SessionContext,
    path: &str,
) -> Verdict {
    let class = classify(path);
    let identity = resolve_identity(sessions, profiles, session).await;
    let outcome = decide(&identity, class);
    debug!(%path, ?class, ?outcome, "guard: decided");

    let viewer = match (outcome, identity) {
        (Outcome::Render, Identity::Resolved { user, role }) => Some(Viewer { user, role, session: session.clone() }),
        _ => None,
    };
    Verdict { path: path.to_string(), class, outcome, viewer }
}

#[cfg(test)]
#[path = "decision_test.rs"]
mod tests;
