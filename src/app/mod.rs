//! Application services. Each service owns a handle to the shared store and
//! enforces validation before anything is written.

pub mod auth_service;
pub mod certificate_service;
pub mod order_service;
pub mod tag_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use certificate_service::CertificateService;
pub use order_service::OrderService;
pub use tag_service::TagService;
pub use user_service::{Registration, UserService};

use crate::domain::auth::{JwtHandler, PasswordHasher};
use crate::storage::MarketplaceStore;
use std::sync::Arc;

/// Every service, wired to the same store.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub tags: TagService,
    pub certificates: CertificateService,
    pub orders: OrderService,
    pub auth: AuthService,
}

impl Services {
    pub fn new(store: Arc<dyn MarketplaceStore>, jwt: JwtHandler, hasher: PasswordHasher) -> Self {
        let users = UserService::new(store.clone(), hasher);
        Self {
            tags: TagService::new(store.clone()),
            certificates: CertificateService::new(store.clone()),
            orders: OrderService::new(store),
            auth: AuthService::new(users.clone(), jwt),
            users,
        }
    }
}
