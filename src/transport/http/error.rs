//! Maps service and auth errors onto HTTP responses.

use crate::domain::auth::AuthError;
use crate::domain::error::ServiceError;
use crate::transport::http::types::ErrorResponse;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    /// Value of the `WWW-Authenticate` header, if any.
    challenge: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            challenge: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// A rejected refresh token is always 401: the client has to log in again.
    pub fn refresh_rejected(err: AuthError) -> Self {
        match err {
            AuthError::Invalid(_) | AuthError::WrongTokenKind { .. } => {
                ApiError::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            other => other.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::Expired(_) => {
                let message = err.to_string();
                ApiError {
                    status: StatusCode::UNAUTHORIZED,
                    challenge: Some(format!(
                        "Bearer error=\"invalid_token\", error_description=\"{}\"",
                        message
                    )),
                    message,
                }
            }
            AuthError::Invalid(_) | AuthError::WrongTokenKind { .. } => {
                ApiError::new(StatusCode::FORBIDDEN, err.to_string())
            }
            AuthError::Signing(_) => {
                tracing::error!(error = %err, "token signing failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::new(StatusCode::NOT_FOUND, msg),
            ServiceError::InvalidParameter(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            ServiceError::Conflict(msg) => ApiError::new(StatusCode::CONFLICT, msg),
            ServiceError::Unauthorized(msg) => ApiError::new(StatusCode::UNAUTHORIZED, msg),
            ServiceError::Forbidden(msg) => ApiError::new(StatusCode::FORBIDDEN, msg),
            ServiceError::Auth(auth) => auth.into(),
            ServiceError::Storage(e) => {
                tracing::error!(error = %format!("{:#}", e), "storage failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid JSON body: {}", err.body_text()),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid query: {}", err.body_text()),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid path parameter: {}", err.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        }
        let mut response = (self.status, Json(ErrorResponse::new(self.message))).into_response();
        if let Some(challenge) = self.challenge {
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}
