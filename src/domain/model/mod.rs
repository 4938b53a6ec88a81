//! Marketplace entities: users, tags, gift certificates and orders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

pub mod certificate;
pub mod order;
pub mod page;
pub mod tag;
pub mod user;

pub use certificate::{
    Certificate, CertificateDraft, CertificateFilter, CertificatePatch, SortField, SortOrder,
    SortSpec,
};
pub use order::Order;
pub use page::Page;
pub use tag::Tag;
pub use user::{NewUser, User};

/// Authority prefix carried in the JWT `roles` claim.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Role of a marketplace user. Every self-registered account is a `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Granted authority string, e.g. `ROLE_ADMIN`.
    pub fn authority(&self) -> String {
        format!("{}{}", ROLE_PREFIX, self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}
