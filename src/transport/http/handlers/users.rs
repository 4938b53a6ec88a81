use crate::app::Registration;
use crate::domain::error::ServiceError;
use crate::domain::model::Page;
use crate::transport::http::auth::RefreshToken;
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{
    AppState, ErrorResponse, LoginRequest, LoginResponse, PageParams, PageResponse,
    RegisterRequest, TokenResponse, UserPage, UserResponse,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid name, email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid JSON body", body = ErrorResponse)
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(request) = request?;
    let user = state
        .services
        .users
        .register(Registration {
            name: request.name,
            surname: request.surname,
            email: request.email,
            password: request.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/users/auth",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse),
        (status = 422, description = "Invalid JSON body", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = request?;
    let (user, tokens) = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        email: user.email,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

#[utoipa::path(
    get,
    path = "/users/token/refresh",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "New access token; the refresh token is returned unchanged", body = TokenResponse),
        (status = 401, description = "Missing, expired or invalid refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    Extension(RefreshToken(refresh_token)): Extension<RefreshToken>,
) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = state
        .services
        .auth
        .refresh(&refresh_token)
        .await
        .map_err(|e| match e {
            ServiceError::Auth(auth) => ApiError::refresh_rejected(auth),
            other => other.into(),
        })?;
    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
    }))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(PageParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users ordered by id", body = UserPage),
        (status = 400, description = "Invalid page parameters", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    )
)]
pub async fn list_users_handler(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageResponse<UserResponse>>, ApiError> {
    let Query(params) = params?;
    let page = Page::new(params.page, params.size)?;
    let users = state.services.users.read_all(page).await?;
    Ok(Json(PageResponse::new(page, users)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    )
)]
pub async fn get_user_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let user = state.services.users.read(id).await?;
    Ok(Json(user.into()))
}
