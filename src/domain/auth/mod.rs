//! Authentication and authorization primitives.
//!
//! - [`jwt`]: HS256 access/refresh token issuance and verification.
//! - [`password`]: bcrypt password hashing.
//! - [`access`]: which routes are public, which need a token, which need `ADMIN`.

use crate::domain::model::Role;

pub mod access;
pub mod jwt;
pub mod password;

pub use access::{required_access, Access};
pub use jwt::{Claims, JwtHandler, TokenKind, TokenPair};
pub use password::PasswordHasher;

/// Errors raised while authenticating a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header on a protected route.
    #[error("You must be logged in")]
    MissingToken,

    #[error("The {0} token expired")]
    Expired(TokenKind),

    /// Bad signature, malformed token or missing claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// A refresh token presented where an access token is required, or vice versa.
    #[error("expected an {expected} token")]
    WrongTokenKind { expected: TokenKind },

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        let authority = role.authority();
        self.roles.iter().any(|r| *r == authority)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}
