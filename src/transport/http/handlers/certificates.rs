use crate::domain::model::{CertificateDraft, CertificateFilter, CertificatePatch, Page, SortSpec};
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{
    AppState, CertificatePage, CertificateResponse, CertificateSearchParams,
    CreateCertificateRequest, ErrorResponse, PageResponse, UpdateCertificateRequest,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

/// Splits `tags=a,b` into names, skipping empty segments.
fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl CertificateSearchParams {
    fn filter(&self) -> CertificateFilter {
        CertificateFilter {
            tags: split_tags(self.tags.as_deref()),
            search: self.search.clone(),
            sort: self.sort_by.map(|field| SortSpec {
                field,
                order: self.order.unwrap_or_default(),
            }),
        }
    }
}

#[utoipa::path(
    get,
    path = "/certificates",
    tag = "certificates",
    params(CertificateSearchParams),
    responses(
        (status = 200, description = "Matching certificates", body = CertificatePage),
        (status = 400, description = "Invalid query or page parameters", body = ErrorResponse)
    )
)]
pub async fn search_certificates_handler(
    State(state): State<AppState>,
    params: Result<Query<CertificateSearchParams>, QueryRejection>,
) -> Result<Json<PageResponse<CertificateResponse>>, ApiError> {
    let Query(params) = params?;
    let page = Page::new(params.page, params.size)?;
    let found = state
        .services
        .certificates
        .search(params.filter(), page)
        .await?;
    Ok(Json(PageResponse::new(page, found)))
}

#[utoipa::path(
    get,
    path = "/certificates/{id}",
    tag = "certificates",
    params(("id" = i64, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate", body = CertificateResponse),
        (status = 404, description = "No such certificate", body = ErrorResponse)
    )
)]
pub async fn get_certificate_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CertificateResponse>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.services.certificates.read(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/certificates",
    tag = "certificates",
    request_body = CreateCertificateRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Certificate created", body = CertificateResponse),
        (status = 400, description = "Invalid field values", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 422, description = "Invalid JSON body", body = ErrorResponse)
    )
)]
pub async fn create_certificate_handler(
    State(state): State<AppState>,
    request: Result<Json<CreateCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CertificateResponse>), ApiError> {
    let Json(request) = request?;
    let created = state
        .services
        .certificates
        .create(CertificateDraft {
            name: request.name,
            description: request.description,
            price: request.price,
            duration: request.duration,
            tags: request.tags,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    patch,
    path = "/certificates/{id}",
    tag = "certificates",
    params(("id" = i64, Path, description = "Certificate id")),
    request_body = UpdateCertificateRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated certificate", body = CertificateResponse),
        (status = 400, description = "Empty patch or invalid field values", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "No such certificate", body = ErrorResponse),
        (status = 422, description = "Invalid JSON body", body = ErrorResponse)
    )
)]
pub async fn update_certificate_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    request: Result<Json<UpdateCertificateRequest>, JsonRejection>,
) -> Result<Json<CertificateResponse>, ApiError> {
    let Path(id) = id?;
    let Json(request) = request?;
    let updated = state
        .services
        .certificates
        .update(
            id,
            CertificatePatch {
                name: request.name,
                description: request.description,
                price: request.price,
                duration: request.duration,
                tags: request.tags,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/certificates/{id}",
    tag = "certificates",
    params(("id" = i64, Path, description = "Certificate id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Certificate deleted"),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "No such certificate", body = ErrorResponse),
        (status = 409, description = "Certificate has orders", body = ErrorResponse)
    )
)]
pub async fn delete_certificate_handler(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.services.certificates.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
