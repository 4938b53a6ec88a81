// src/bin/api_server.rs

use chrono::Duration;
use giftcert_marketplace::infra::{logging, AppConfig};
use giftcert_marketplace::transport;
use giftcert_marketplace::{JwtHandler, MarketplaceStore, MemoryStore, PasswordHasher, PgStore, Services};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let config = AppConfig::from_env()?;

    // --- Store ---
    let store: Arc<dyn MarketplaceStore> = match config.database_url.as_deref() {
        Some(url) => {
            tracing::info!(max_connections = config.db_max_connections, "connecting to PostgreSQL");
            Arc::new(PgStore::connect(url, config.db_max_connections).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Services ---
    let jwt = JwtHandler::new(
        config.jwt_secret.as_bytes(),
        Duration::minutes(config.access_expiration_minutes),
        Duration::minutes(config.refresh_expiration_minutes),
    );
    let services = Services::new(store.clone(), jwt, PasswordHasher::new(config.bcrypt_cost));

    if let Some(admin) = &config.admin {
        services.users.ensure_admin(&admin.email, &admin.password).await?;
    }

    let app_state = transport::http::AppState { store, services };

    // --- API Server ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "API server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
