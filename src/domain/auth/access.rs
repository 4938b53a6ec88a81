//! Route access policy.
//!
//! Rules are checked top to bottom, the first match wins:
//! - `GET /certificates/**`, `POST /users/register`, `POST /users/auth`,
//!   health and API docs are public;
//! - `GET /users/token/refresh` needs a refresh token;
//! - `POST /orders` and `GET /tags/**`, `/users/**`, `/orders/**` need any valid access token;
//! - everything else needs the `ADMIN` role.

use axum::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    RefreshToken,
    Authenticated,
    Admin,
}

pub const REFRESH_PATH: &str = "/users/token/refresh";

pub fn required_access(method: &Method, path: &str) -> Access {
    let path = normalize(path);

    if *method == Method::GET && path == REFRESH_PATH {
        return Access::RefreshToken;
    }

    if *method == Method::GET
        && (under(path, "/certificates")
            || path == "/health"
            || under(path, "/swagger-ui")
            || under(path, "/api-docs"))
    {
        return Access::Public;
    }
    if *method == Method::POST && (path == "/users/register" || path == "/users/auth") {
        return Access::Public;
    }

    if *method == Method::POST && path == "/orders" {
        return Access::Authenticated;
    }
    if *method == Method::GET
        && (under(path, "/tags") || under(path, "/users") || under(path, "/orders"))
    {
        return Access::Authenticated;
    }

    Access::Admin
}

/// Ant-style `prefix/**`: the prefix itself or anything below it.
fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_reads_are_public_but_writes_are_admin() {
        assert_eq!(required_access(&Method::GET, "/certificates"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/certificates/7"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/certificates"), Access::Admin);
        assert_eq!(required_access(&Method::PATCH, "/certificates/7"), Access::Admin);
        assert_eq!(required_access(&Method::DELETE, "/certificates/7"), Access::Admin);
    }

    #[test]
    fn registration_and_login_are_public() {
        assert_eq!(required_access(&Method::POST, "/users/register"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/users/auth"), Access::Public);
        assert_eq!(required_access(&Method::GET, "/health"), Access::Public);
        assert_eq!(
            required_access(&Method::GET, "/api-docs/openapi.json"),
            Access::Public
        );
    }

    #[test]
    fn refresh_endpoint_is_handled_separately() {
        assert_eq!(
            required_access(&Method::GET, "/users/token/refresh"),
            Access::RefreshToken
        );
    }

    #[test]
    fn reads_and_ordering_need_authentication() {
        assert_eq!(required_access(&Method::GET, "/tags"), Access::Authenticated);
        assert_eq!(
            required_access(&Method::GET, "/tags/most-popular-tag"),
            Access::Authenticated
        );
        assert_eq!(required_access(&Method::GET, "/users/3"), Access::Authenticated);
        assert_eq!(
            required_access(&Method::GET, "/orders/users/3"),
            Access::Authenticated
        );
        assert_eq!(required_access(&Method::POST, "/orders"), Access::Authenticated);
    }

    #[test]
    fn everything_else_is_admin_only() {
        assert_eq!(required_access(&Method::POST, "/tags"), Access::Admin);
        assert_eq!(required_access(&Method::DELETE, "/tags/1"), Access::Admin);
        assert_eq!(required_access(&Method::DELETE, "/orders/1"), Access::Admin);
        assert_eq!(required_access(&Method::POST, "/users"), Access::Admin);
    }

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        assert_eq!(required_access(&Method::GET, "/tagsxyz"), Access::Admin);
        assert_eq!(required_access(&Method::GET, "/certificates/"), Access::Public);
    }
}
