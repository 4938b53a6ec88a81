//! Bearer-token authentication middleware.
//!
//! Every routed request is classified by [`required_access`]. Protected
//! requests must carry `Authorization: Bearer <token>`; the verified identity is
//! stored as an [`AuthenticatedUser`] request extension for handlers to read.

use crate::domain::auth::{required_access, Access, AuthError, AuthenticatedUser, TokenKind};
use crate::domain::error::ServiceError;
use crate::transport::http::error::ApiError;
use crate::transport::http::types::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Raw refresh token, verified by the middleware, for the refresh endpoint.
#[derive(Debug, Clone)]
pub struct RefreshToken(pub String);

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

pub async fn authorize(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let access = required_access(request.method(), request.uri().path());
    if access == Access::Public {
        return next.run(request).await;
    }

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return ApiError::from(AuthError::MissingToken).into_response(),
    };

    let jwt = state.services.auth.jwt();
    match access {
        Access::Public => {}
        Access::RefreshToken => {
            if let Err(e) = jwt.verify(&token, TokenKind::Refresh) {
                return ApiError::refresh_rejected(e).into_response();
            }
            request.extensions_mut().insert(RefreshToken(token));
        }
        Access::Authenticated | Access::Admin => {
            let caller = match state.services.auth.authenticate_bearer(&token) {
                Ok(caller) => caller,
                Err(e) => return ApiError::from(e).into_response(),
            };
            if access == Access::Admin && !caller.is_admin() {
                tracing::debug!(email = %caller.email, path = %request.uri().path(), "admin route denied");
                return ApiError::from(ServiceError::forbidden()).into_response();
            }
            request.extensions_mut().insert::<AuthenticatedUser>(caller);
        }
    }

    next.run(request).await
}
