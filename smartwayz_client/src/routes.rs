//! Which backend routes may be called without a bearer token.

use crate::transport::Method;

pub const LOGIN_CITIZEN: &str = "/auth/login/citizen/";
pub const LOGIN_AUTHORITY: &str = "/auth/login/authority/";
pub const REFRESH: &str = "/auth/refresh/";
pub const LOGOUT: &str = "/auth/logout/";
pub const CITIZENS: &str = "/citizens/";
pub const CATEGORIES: &str = "/categories/";
pub const SUBCATEGORIES: &str = "/subcategories/";
pub const REPORTS: &str = "/reports/";
pub const GEOCODE_REVERSE: &str = "/geocoding/reverse/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointAccess {
    /// Sent without credentials; a 401 is an ordinary failure.
    Public,
    /// Carries the bearer token; a 401 triggers the refresh protocol.
    Protected,
}

impl EndpointAccess {
    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

/// Classifies an endpoint path relative to the api base url.
///
/// Report routes are always protected, even when they sit under an
/// otherwise public prefix.
pub fn classify(method: Method, endpoint: &str) -> EndpointAccess {
    let path = endpoint
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();

    if segments.iter().any(|segment| segment.starts_with("reports")) {
        return EndpointAccess::Protected;
    }

    let public = match segments.as_slice() {
        ["auth", "login", "citizen" | "authority"] => true,
        ["auth", "refresh" | "logout"] => true,
        ["citizens"] => method == Method::Post,
        ["categories" | "subcategories"] => method == Method::Get,
        ["categories" | "subcategories", id] => method == Method::Get && is_numeric_id(id),
        ["categories", id, "subcategories"] => method == Method::Get && is_numeric_id(id),
        _ => false,
    };

    if public {
        EndpointAccess::Public
    } else {
        EndpointAccess::Protected
    }
}

pub fn login_path(role: smartwayz_core::Role) -> &'static str {
    match role {
        smartwayz_core::Role::Citizen => LOGIN_CITIZEN,
        smartwayz_core::Role::Authority => LOGIN_AUTHORITY,
    }
}

fn is_numeric_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit())
}
