//! Route classification: a pure function of the requested path.

use serde::Serialize;

use crate::backend::Role;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_HOME: &str = "/admin";
pub const CUSTOMER_HOME: &str = "/dashboard";

/// Access category of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    PublicLogin,
    AdminArea,
    CustomerArea,
    /// Matches no listed prefix; unrestricted for any resolved role.
    Other,
}

/// Prefix table, matched in order. Prefixes match raw string starts, so
/// `/admin` also covers `/admin/clients` and `/administration`.
const ROUTE_TABLE: &[(&str, RouteClass)] = &[
    (ADMIN_HOME, RouteClass::AdminArea),
    (CUSTOMER_HOME, RouteClass::CustomerArea),
    ("/packages", RouteClass::CustomerArea),
];

/// Strip query string and fragment, collapse trailing slashes.
#[must_use]
pub fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[must_use]
pub fn classify(path: &str) -> RouteClass {
    let path = normalize(path);
    if path == LOGIN_PATH {
        return RouteClass::PublicLogin;
    }
    ROUTE_TABLE
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map_or(RouteClass::Other, |(_, class)| *class)
}

/// Landing page for a role.
#[must_use]
pub fn home_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_HOME,
        Role::Customer => CUSTOMER_HOME,
    }
}

#[cfg(test)]
#[path = "route_test.rs"]
mod tests;
