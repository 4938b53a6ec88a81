pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::Services;
pub use domain::auth::{JwtHandler, PasswordHasher};
pub use domain::error::{ServiceError, ServiceResult};
pub use infra::config::AppConfig;
pub use storage::{MarketplaceStore, MemoryStore, PgStore};
