use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{Order, Page};
use crate::storage::MarketplaceStore;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn MarketplaceStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Places an order; the cost is the certificate's current price.
    pub async fn create(&self, user_id: i64, certificate_id: i64) -> ServiceResult<Order> {
        if self.store.user_by_id(user_id).await?.is_none() {
            return Err(ServiceError::not_found("user", user_id));
        }
        let certificate = self
            .store
            .certificate_by_id(certificate_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("certificate", certificate_id))?;

        let order = self
            .store
            .insert_order(user_id, certificate.id, certificate.price, Utc::now())
            .await?;
        tracing::info!(
            order_id = order.id,
            user_id,
            certificate_id,
            cost = order.cost,
            "order placed"
        );
        Ok(order)
    }

    pub async fn read(&self, id: i64) -> ServiceResult<Order> {
        self.store
            .order_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))
    }

    pub async fn read_all_by_user(&self, user_id: i64, page: Page) -> ServiceResult<Vec<Order>> {
        if self.store.user_by_id(user_id).await?.is_none() {
            return Err(ServiceError::not_found("user", user_id));
        }
        Ok(self.store.orders_by_user(user_id, page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CertificateDraft, NewUser, Role, User};
    use crate::storage::MemoryStore;

    async fn seed() -> (OrderService, Arc<MemoryStore>, User, i64) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Jane".into(),
                surname: "Doe".into(),
                email: "jane@example.com".into(),
                password_hash: "x".into(),
                role: Role::User,
            })
            .await
            .unwrap()
            .unwrap();
        let certificate = store
            .insert_certificate(
                &CertificateDraft {
                    name: "Spa".into(),
                    description: "Relax".into(),
                    price: 2500,
                    duration: 30,
                    tags: vec!["spa".into()],
                },
                Utc::now(),
            )
            .await
            .unwrap();
        (OrderService::new(store.clone()), store, user, certificate.id)
    }

    #[tokio::test]
    async fn order_costs_the_current_price() {
        let (orders, _, user, certificate_id) = seed().await;
        let order = orders.create(user.id, certificate_id).await.unwrap();

        assert_eq!(order.cost, 2500);
        assert_eq!(order.user.id, user.id);
        assert_eq!(order.certificate.id, certificate_id);
        assert_eq!(orders.read(order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn ordering_missing_entities_is_not_found() {
        let (orders, _, user, certificate_id) = seed().await;
        assert!(matches!(
            orders.create(user.id, 999).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            orders.create(999, certificate_id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(orders.read(1).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn orders_by_user_are_paged() {
        let (orders, _, user, certificate_id) = seed().await;
        for _ in 0..3 {
            orders.create(user.id, certificate_id).await.unwrap();
        }

        let page = orders
            .read_all_by_user(user.id, Page::new(Some(2), Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.len(), 1);

        assert!(matches!(
            orders.read_all_by_user(999, Page::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
