//! Identity endpoint client (`/auth/v1`).
//!
//! Thin HTTP wrapper; pure parsing in `parse_*` for testability.

use serde::Serialize;

use super::types::{AuthSession, AuthUser, BackendError, SessionContext, SessionProvider, SignUpOutcome};
use super::{BackendClient, send, status_error};

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[async_trait::async_trait]
impl SessionProvider for BackendClient {
    async fn current_user(&self, session: &SessionContext) -> Result<Option<AuthUser>, BackendError> {
        if session.is_anonymous() {
            return Ok(None);
        }
        let req = self.authorize(self.http.get(self.auth_url("user")), session);
        let (status, body) = send(req).await?;
        parse_user_response(status, &body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let req = self
            .authorize(self.http.post(self.auth_url("token?grant_type=password")), &SessionContext::anonymous())
            .json(&Credentials { email, password });
        let (status, body) = send(req).await?;
        parse_sign_in_response(status, &body)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let req = self
            .authorize(self.http.post(self.auth_url("signup")), &SessionContext::anonymous())
            .json(&Credentials { email, password });
        let (status, body) = send(req).await?;
        parse_sign_up_response(status, &body)
    }

    async fn sign_out(&self, session: &SessionContext) -> Result<(), BackendError> {
        if session.is_anonymous() {
            return Ok(());
        }
        let req = self.authorize(self.http.post(self.auth_url("logout")), session);
        let (status, body) = send(req).await?;
        // An already-expired token means there is nothing left to revoke.
        if (200..300).contains(&status) || status == 401 {
            Ok(())
        } else {
            Err(status_error(status, &body))
        }
    }
}

/// `GET /user`: 200 carries the user; 401/403 mean the token is missing,
/// expired or revoked, which is "no user" rather than a failure.
pub(crate) fn parse_user_response(status: u16, body: &str) -> Result<Option<AuthUser>, BackendError> {
    match status {
        200 => serde_json::from_str::<AuthUser>(body)
            .map(Some)
            .map_err(|e| BackendError::Parse(e.to_string())),
        401 | 403 => Ok(None),
        _ => Err(status_error(status, body)),
    }
}

pub(crate) fn parse_sign_in_response(status: u16, body: &str) -> Result<AuthSession, BackendError> {
    if status != 200 {
        return Err(status_error(status, body));
    }
    serde_json::from_str::<AuthSession>(body).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Sign-up returns a full session when auto-confirm is on, and a bare user
/// object when the address still has to be confirmed.
pub(crate) fn parse_sign_up_response(status: u16, body: &str) -> Result<SignUpOutcome, BackendError> {
    if !(200..300).contains(&status) {
        return Err(status_error(status, body));
    }
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    if value.get("access_token").is_some() {
        let session = serde_json::from_value::<AuthSession>(value).map_err(|e| BackendError::Parse(e.to_string()))?;
        return Ok(SignUpOutcome::Session(session));
    }
    let user_value = value.get("user").cloned().unwrap_or(value);
    let user = serde_json::from_value::<AuthUser>(user_value).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(SignUpOutcome::PendingConfirmation(user))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
