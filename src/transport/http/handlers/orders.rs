//! Order endpoints. Callers may only place and read their own orders;
//! administrators can read anyone's.

use crate::domain::auth::AuthenticatedUser;
use crate::domain::error::ServiceError;
use crate::domain::model::Page;
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{
    AppState, CreateOrderRequest, ErrorResponse, OrderPage, OrderResponse, PageParams,
    PageResponse,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Order placed at the certificate's current price", body = OrderResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Ordering on behalf of another user", body = ErrorResponse),
        (status = 404, description = "No such user or certificate", body = ErrorResponse),
        (status = 422, description = "Invalid JSON body", body = ErrorResponse)
    )
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    request: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(request) = request?;
    let me = state.services.auth.current_user(&caller).await?;
    if me.id != request.user_id {
        return Err(ServiceError::forbidden().into());
    }
    let order = state
        .services
        .orders
        .create(request.user_id, request.certificate_id)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    params(("id" = i64, Path, description = "Order id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order with its user and certificate", body = OrderResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Order belongs to another user", body = ErrorResponse),
        (status = 404, description = "No such order", body = ErrorResponse)
    )
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let order = state.services.orders.read(id).await?;
    if !caller.is_admin() && order.user.email != caller.email {
        return Err(ServiceError::forbidden().into());
    }
    Ok(Json(order.into()))
}

#[utoipa::path(
    get,
    path = "/orders/users/{user_id}",
    tag = "orders",
    params(
        ("user_id" = i64, Path, description = "User id"),
        PageParams
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The user's orders ordered by id", body = OrderPage),
        (status = 400, description = "Invalid page parameters", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Orders of another user", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    )
)]
pub async fn list_user_orders_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    user_id: Result<Path<i64>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let Path(user_id) = user_id?;
    let Query(params) = params?;
    let page = Page::new(params.page, params.size)?;
    if !caller.is_admin() {
        let me = state.services.auth.current_user(&caller).await?;
        if me.id != user_id {
            return Err(ServiceError::forbidden().into());
        }
    }
    let orders = state.services.orders.read_all_by_user(user_id, page).await?;
    Ok(Json(PageResponse::new(page, orders)))
}
