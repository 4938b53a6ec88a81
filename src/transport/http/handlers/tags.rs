use crate::domain::model::Page;
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{
    AppState, CreateTagRequest, ErrorResponse, PageParams, PageResponse, TagPage, TagResponse,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    get,
    path = "/tags",
    tag = "tags",
    params(PageParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tags ordered by id", body = TagPage),
        (status = 400, description = "Invalid page parameters", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    )
)]
pub async fn list_tags_handler(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageResponse<TagResponse>>, ApiError> {
    let Query(params) = params?;
    let page = Page::new(params.page, params.size)?;
    let tags = state.services.tags.read_all(page).await?;
    Ok(Json(PageResponse::new(page, tags)))
}

#[utoipa::path(
    get,
    path = "/tags/{id}",
    tag = "tags",
    params(("id" = i64, Path, description = "Tag id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 404, description = "No such tag", body = ErrorResponse)
    )
)]
pub async fn get_tag_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<TagResponse>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.services.tags.read(id).await?.into()))
}

/// Most used tag among the orders of the customer with the highest total spend.
#[utoipa::path(
    get,
    path = "/tags/most-popular-tag",
    tag = "tags",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Most popular tag of the top customer", body = TagResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 404, description = "No orders with tagged certificates", body = ErrorResponse)
    )
)]
pub async fn most_popular_tag_handler(
    State(state): State<AppState>,
) -> Result<Json<TagResponse>, ApiError> {
    Ok(Json(state.services.tags.most_popular().await?.into()))
}

#[utoipa::path(
    post,
    path = "/tags",
    tag = "tags",
    request_body = CreateTagRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 400, description = "Blank or oversized name", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 409, description = "Tag already exists", body = ErrorResponse),
        (status = 422, description = "Invalid JSON body", body = ErrorResponse)
    )
)]
pub async fn create_tag_handler(
    State(state): State<AppState>,
    request: Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let Json(request) = request?;
    let tag = state.services.tags.create(&request.name).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

#[utoipa::path(
    delete,
    path = "/tags/{id}",
    tag = "tags",
    params(("id" = i64, Path, description = "Tag id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "No such tag", body = ErrorResponse)
    )
)]
pub async fn delete_tag_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.services.tags.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
