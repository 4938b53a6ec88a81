use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{Page, Tag};
use crate::storage::MarketplaceStore;
use std::sync::Arc;

/// Longest accepted tag name.
pub const MAX_TAG_NAME_LEN: usize = 64;

/// Trims a tag name and rejects blank or oversized names.
pub fn normalize_tag_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidParameter(
            "tag name must not be blank".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LEN {
        return Err(ServiceError::InvalidParameter(format!(
            "tag name must be at most {} characters",
            MAX_TAG_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn MarketplaceStore>,
}

impl TagService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn read(&self, id: i64) -> ServiceResult<Tag> {
        self.store
            .tag_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("tag", id))
    }

    pub async fn read_all(&self, page: Page) -> ServiceResult<Vec<Tag>> {
        Ok(self.store.list_tags(page).await?)
    }

    pub async fn create(&self, name: &str) -> ServiceResult<Tag> {
        let name = normalize_tag_name(name)?;
        let Some(tag) = self.store.insert_tag(&name).await? else {
            return Err(ServiceError::Conflict(format!(
                "Tag '{}' already exists",
                name
            )));
        };
        tracing::debug!(tag_id = tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    /// Deletes the tag and detaches it from every certificate.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.store.delete_tag(id).await? {
            return Err(ServiceError::not_found("tag", id));
        }
        tracing::debug!(tag_id = id, "tag deleted");
        Ok(())
    }

    /// The most used tag of the customer who spent the most on orders.
    pub async fn most_popular(&self) -> ServiceResult<Tag> {
        self.store
            .most_popular_tag_of_top_customer()
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No orders with tagged certificates found".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> TagService {
        TagService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_trims_and_rejects_duplicates() {
        let tags = service();
        let tag = tags.create("  spa ").await.unwrap();
        assert_eq!(tag.name, "spa");
        assert_eq!(tags.read(tag.id).await.unwrap(), tag);

        assert!(matches!(
            tags.create("spa").await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_creates_yield_one_conflict() {
        let tags = service();
        let (first, second) = tokio::join!(tags.create("spa"), tags.create(" spa"));

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ServiceError::Conflict(_)))));
    }

    #[tokio::test]
    async fn blank_or_long_names_are_invalid() {
        let tags = service();
        assert!(matches!(
            tags.create("   ").await,
            Err(ServiceError::InvalidParameter(_))
        ));
        let long = "x".repeat(MAX_TAG_NAME_LEN + 1);
        assert!(matches!(
            tags.create(&long).await,
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn delete_missing_tag_is_not_found() {
        let tags = service();
        let tag = tags.create("spa").await.unwrap();
        tags.delete(tag.id).await.unwrap();

        assert!(matches!(
            tags.delete(tag.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(tags.read(tag.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn most_popular_without_orders_is_not_found() {
        let tags = service();
        tags.create("spa").await.unwrap();
        assert!(matches!(
            tags.most_popular().await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
