//! Service-level error type shared by every use case.

use crate::domain::auth::AuthError;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub const PERMISSION_MESSAGE: &str = "You don't have permission to do that";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidParameter(String),

    /// Uniqueness or referential conflict (duplicate email, tag in use, ...).
    #[error("{0}")]
    Conflict(String),

    /// Credentials were presented and rejected.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to touch the resource.
    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        ServiceError::NotFound(format!(
            "Requested resource not found ({} id = {})",
            entity, id
        ))
    }

    pub fn forbidden() -> Self {
        ServiceError::Forbidden(PERMISSION_MESSAGE.to_string())
    }
}
