use crate::domain::model::{Role, SortField, SortOrder};
use crate::transport::http::auth;
use crate::transport::http::handlers::{certificates, health, orders, tags, users};
use crate::transport::http::types::{
    AppState, CertificatePage, CertificateResponse, CreateCertificateRequest, CreateOrderRequest,
    CreateTagRequest, ErrorResponse, HealthResponse, LoginRequest, LoginResponse, OrderPage,
    OrderResponse, RegisterRequest, TagPage, TagResponse, TokenResponse, UpdateCertificateRequest,
    UserPage, UserResponse,
};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        users::register_handler,
        users::login_handler,
        users::refresh_handler,
        users::list_users_handler,
        users::get_user_handler,
        tags::list_tags_handler,
        tags::get_tag_handler,
        tags::most_popular_tag_handler,
        tags::create_tag_handler,
        tags::delete_tag_handler,
        certificates::search_certificates_handler,
        certificates::get_certificate_handler,
        certificates::create_certificate_handler,
        certificates::update_certificate_handler,
        certificates::delete_certificate_handler,
        orders::create_order_handler,
        orders::get_order_handler,
        orders::list_user_orders_handler
    ),
    components(schemas(
        ErrorResponse,
        HealthResponse,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        TokenResponse,
        UserResponse,
        Role,
        CreateTagRequest,
        TagResponse,
        CreateCertificateRequest,
        UpdateCertificateRequest,
        CertificateResponse,
        SortField,
        SortOrder,
        CreateOrderRequest,
        OrderResponse,
        UserPage,
        TagPage,
        CertificatePage,
        OrderPage
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health"),
        (name = "users", description = "Registration, login and user lookup"),
        (name = "tags"),
        (name = "certificates", description = "Gift certificate catalogue"),
        (name = "orders")
    )
)]
pub struct ApiDoc;

/// Declares the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// API routes behind the auth middleware. Unknown paths fall through to 404
/// without an auth check.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/users", get(users::list_users_handler))
        .route("/users/register", post(users::register_handler))
        .route("/users/auth", post(users::login_handler))
        .route("/users/token/refresh", get(users::refresh_handler))
        .route("/users/:id", get(users::get_user_handler))
        .route(
            "/tags",
            get(tags::list_tags_handler).post(tags::create_tag_handler),
        )
        .route("/tags/most-popular-tag", get(tags::most_popular_tag_handler))
        .route(
            "/tags/:id",
            get(tags::get_tag_handler).delete(tags::delete_tag_handler),
        )
        .route(
            "/certificates",
            get(certificates::search_certificates_handler)
                .post(certificates::create_certificate_handler),
        )
        .route(
            "/certificates/:id",
            get(certificates::get_certificate_handler)
                .patch(certificates::update_certificate_handler)
                .delete(certificates::delete_certificate_handler),
        )
        .route("/orders", post(orders::create_order_handler))
        .route("/orders/:id", get(orders::get_order_handler))
        .route("/orders/users/:user_id", get(orders::list_user_orders_handler))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::authorize,
        ))
        .with_state(app_state)
}
