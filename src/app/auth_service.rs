//! Login, token refresh and bearer-token authentication.

use super::user_service::UserService;
use crate::domain::auth::{AuthError, AuthenticatedUser, JwtHandler, TokenKind, TokenPair};
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::User;

#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    jwt: JwtHandler,
}

impl AuthService {
    pub fn new(users: UserService, jwt: JwtHandler) -> Self {
        Self { users, jwt }
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    /// Checks the credentials and issues an access/refresh pair.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(User, TokenPair)> {
        let user = self.users.authenticate(email, password).await?;
        let tokens = self.jwt.issue_pair(&user.email, user.role)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The role is re-read from storage so a changed role takes effect on refresh.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<String> {
        let claims = self.jwt.verify(refresh_token, TokenKind::Refresh)?;
        let user = match self.users.find_by_email(&claims.sub).await {
            Ok(user) => user,
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::Unauthorized(
                    "Token subject no longer exists".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };
        Ok(self.jwt.issue_access(&user.email, user.role)?)
    }

    /// Verifies an access token and returns the identity it carries.
    pub fn authenticate_bearer(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.jwt.verify(token, TokenKind::Access)?;
        Ok(AuthenticatedUser {
            email: claims.sub,
            roles: claims.roles,
        })
    }

    /// Resolves the caller to a stored user.
    pub async fn current_user(&self, caller: &AuthenticatedUser) -> ServiceResult<User> {
        match self.users.find_by_email(&caller.email).await {
            Err(ServiceError::NotFound(_)) => Err(ServiceError::Unauthorized(
                "Token subject no longer exists".to_string(),
            )),
            other => other,
        }
    }
}
