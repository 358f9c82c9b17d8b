//! Hosted backend: identity and row-level-secured REST endpoints.
//!
//! DESIGN
//! ======
//! One `BackendClient` wraps a shared `reqwest::Client` and implements the
//! three trait seams in [`types`]: the auth endpoint (`/auth/v1`) in
//! [`auth`], the `profiles` and `packages` tables (`/rest/v1`) in [`rest`].
//! Response parsing lives in pure functions so it can be tested without a
//! network.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures, non-success statuses and malformed bodies all come
//! back as [`BackendError`]; callers decide whether that is fatal. The route
//! guard treats every one of them as "not authenticated".

pub mod auth;
pub mod rest;
pub mod types;

use std::time::Duration;

use reqwest::RequestBuilder;

use crate::config::AppConfig;
pub use types::{
    AuthSession, AuthUser, BackendError, NewPackage, NewProfile, Package, PackageFilter, PackageStatus, PackageStore,
    Profile, ProfileLookup, Role, SessionContext, SessionProvider, SignUpOutcome,
};

/// Client for the hosted backend project.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl BackendClient {
    /// Build a client from service config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.backend_url.clone(), anon_key: config.anon_key.clone() })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Attach the project key and a bearer token: the caller's access token
    /// when present, otherwise the anon key.
    fn authorize(&self, req: RequestBuilder, session: &SessionContext) -> RequestBuilder {
        let bearer = session.access_token().unwrap_or(&self.anon_key);
        req.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }
}

/// Send a request and return `(status, body)`. Transport failures become
/// [`BackendError::Transport`]; status handling is left to the caller.
pub(crate) async fn send(req: RequestBuilder) -> Result<(u16, String), BackendError> {
    let response = req
        .send()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    Ok((status, body))
}

/// Pull a human-readable message out of an error body. The auth and REST
/// endpoints use different field names for the same thing.
#[must_use]
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map_or_else(|| body.trim().to_string(), str::to_string)
}

pub(crate) fn status_error(status: u16, body: &str) -> BackendError {
    BackendError::Status { status, message: error_message(body) }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
