//! Persistence contract and its implementations.
//!
//! - [`postgres::PgStore`]: the production store (sqlx + PostgreSQL).
//! - [`memory::MemoryStore`]: process-local store used by tests and database-less runs.
//!
//! Lookups return `Ok(None)` for missing rows; `Err` is reserved for transport/driver failures.
//! Uniqueness and referential outcomes are reported as values, never as `Err`.

use crate::domain::model::{
    Certificate, CertificateDraft, CertificateFilter, CertificatePatch, NewUser, Order, Page, Tag,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of a guarded certificate delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRemoval {
    Deleted,
    Missing,
    /// At least one order references the certificate; nothing was removed.
    Ordered,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> anyhow::Result<()>;

    // --- users ---
    async fn user_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Users ordered by id.
    async fn list_users(&self, page: Page) -> anyhow::Result<Vec<User>>;
    /// `Ok(None)` if the email is already taken.
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<Option<User>>;

    // --- tags ---
    async fn tag_by_id(&self, id: i64) -> anyhow::Result<Option<Tag>>;
    async fn tag_by_name(&self, name: &str) -> anyhow::Result<Option<Tag>>;
    /// Tags ordered by id.
    async fn list_tags(&self, page: Page) -> anyhow::Result<Vec<Tag>>;
    /// `Ok(None)` if a tag with that name exists.
    async fn insert_tag(&self, name: &str) -> anyhow::Result<Option<Tag>>;
    /// Removes the tag and its certificate links. Returns `false` if it did not exist.
    async fn delete_tag(&self, id: i64) -> anyhow::Result<bool>;
    /// Most used tag among the orders of the user with the highest total order cost.
    async fn most_popular_tag_of_top_customer(&self) -> anyhow::Result<Option<Tag>>;

    // --- certificates ---
    async fn certificate_by_id(&self, id: i64) -> anyhow::Result<Option<Certificate>>;
    async fn search_certificates(
        &self,
        filter: &CertificateFilter,
        page: Page,
    ) -> anyhow::Result<Vec<Certificate>>;
    /// Inserts the certificate, creating missing tags and linking all of them atomically.
    async fn insert_certificate(
        &self,
        draft: &CertificateDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Certificate>;
    /// Applies the patch and bumps `last_update_date`. `Ok(None)` if the certificate is missing.
    async fn update_certificate(
        &self,
        id: i64,
        patch: &CertificatePatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Certificate>>;
    /// Deletes the certificate unless an order references it.
    async fn delete_certificate(&self, id: i64) -> anyhow::Result<CertificateRemoval>;

    // --- orders ---
    async fn insert_order(
        &self,
        user_id: i64,
        certificate_id: i64,
        cost: i64,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<Order>;
    async fn order_by_id(&self, id: i64) -> anyhow::Result<Option<Order>>;
    /// A user's orders ordered by id.
    async fn orders_by_user(&self, user_id: i64, page: Page) -> anyhow::Result<Vec<Order>>;
}
