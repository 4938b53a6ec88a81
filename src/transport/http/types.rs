use crate::app::Services;
use crate::domain::model::{Certificate, Order, Page, Role, SortField, SortOrder, Tag, User};
use crate::storage::MarketplaceStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketplaceStore>,
    pub services: Services,
}

/// Body of every non-2xx response.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

// --- users / auth ---

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct LoginResponse {
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Public view of a user. The password hash is never exposed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            surname: user.surname,
            email: user.email,
            role: user.role,
        }
    }
}

// --- tags ---

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateTagRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

// --- certificates ---

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateCertificateRequest {
    pub name: String,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    /// Validity in days.
    pub duration: i32,
    /// Tag names; missing tags are created.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. Omitted fields stay unchanged; `tags` replaces the whole set.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateCertificateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration: Option<i32>,
    pub tags: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CertificateResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration: i32,
    pub create_date: DateTime<Utc>,
    pub last_update_date: DateTime<Utc>,
    pub tags: Vec<TagResponse>,
}

impl From<Certificate> for CertificateResponse {
    fn from(c: Certificate) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            price: c.price,
            duration: c.duration,
            create_date: c.create_date,
            last_update_date: c.last_update_date,
            tags: c.tags.into_iter().map(TagResponse::from).collect(),
        }
    }
}

// --- orders ---

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub certificate_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub user: UserResponse,
    pub certificate: CertificateResponse,
    pub cost: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user: order.user.into(),
            certificate: order.certificate.into(),
            cost: order.cost,
            timestamp: order.timestamp,
        }
    }
}

// --- pagination ---

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[aliases(
    UserPage = PageResponse<UserResponse>,
    TagPage = PageResponse<TagResponse>,
    CertificatePage = PageResponse<CertificateResponse>,
    OrderPage = PageResponse<OrderResponse>
)]
pub struct PageResponse<T> {
    pub page: i64,
    pub size: i64,
    pub items: Vec<T>,
}

impl<T> PageResponse<T> {
    pub fn new<S: Into<T>>(page: Page, items: Vec<S>) -> Self {
        Self {
            page: page.number(),
            size: page.size(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number (default 1).
    pub page: Option<i64>,
    /// Page size, 1..=100 (default 5).
    pub size: Option<i64>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CertificateSearchParams {
    /// Comma-separated tag names; the certificate must carry all of them.
    pub tags: Option<String>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    #[param(inline)]
    pub sort_by: Option<SortField>,
    /// Sort direction (default `asc`); ignored without `sort_by`.
    #[param(inline)]
    pub order: Option<SortOrder>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}
