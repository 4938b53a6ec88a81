//! In-memory `MarketplaceStore`.
//!
//! Mirrors the Postgres store's ordering and tie-breaking rules so that the
//! HTTP layer behaves the same against either backend.

use super::{CertificateRemoval, MarketplaceStore};
use crate::domain::model::{
    Certificate, CertificateDraft, CertificateFilter, CertificatePatch, NewUser, Order, Page,
    SortField, SortOrder, Tag, User,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

struct CertificateRow {
    id: i64,
    name: String,
    description: String,
    price: i64,
    duration: i32,
    create_date: DateTime<Utc>,
    last_update_date: DateTime<Utc>,
    tag_ids: BTreeSet<i64>,
}

struct OrderRow {
    id: i64,
    user_id: i64,
    certificate_id: i64,
    cost: i64,
    timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, Tag>,
    certificates: BTreeMap<i64, CertificateRow>,
    orders: BTreeMap<i64, OrderRow>,
    user_seq: i64,
    tag_seq: i64,
    certificate_seq: i64,
    order_seq: i64,
}

fn next_id(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

fn paginate<T>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset() as usize)
        .take(page.size() as usize)
        .collect()
}

impl Tables {
    fn tag_id_by_name(&self, name: &str) -> Option<i64> {
        self.tags.values().find(|t| t.name == name).map(|t| t.id)
    }

    fn ensure_tag(&mut self, name: &str) -> i64 {
        if let Some(id) = self.tag_id_by_name(name) {
            return id;
        }
        let id = next_id(&mut self.tag_seq);
        self.tags.insert(
            id,
            Tag {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    fn hydrate_certificate(&self, row: &CertificateRow) -> Certificate {
        Certificate {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            price: row.price,
            duration: row.duration,
            create_date: row.create_date,
            last_update_date: row.last_update_date,
            tags: row
                .tag_ids
                .iter()
                .filter_map(|id| self.tags.get(id).cloned())
                .collect(),
        }
    }

    fn hydrate_order(&self, row: &OrderRow) -> anyhow::Result<Order> {
        let user = self
            .users
            .get(&row.user_id)
            .cloned()
            .ok_or_else(|| anyhow!("order {} references missing user {}", row.id, row.user_id))?;
        let certificate = self
            .certificates
            .get(&row.certificate_id)
            .map(|c| self.hydrate_certificate(c))
            .ok_or_else(|| {
                anyhow!(
                    "order {} references missing certificate {}",
                    row.id,
                    row.certificate_id
                )
            })?;
        Ok(Order {
            id: row.id,
            user,
            certificate,
            cost: row.cost,
            timestamp: row.timestamp,
        })
    }
}

/// Process-local store guarded by a single `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, page: Page) -> anyhow::Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.users.values().cloned(), page))
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Ok(None);
        }
        let id = next_id(&mut tables.user_seq);
        let user = User {
            id,
            name: user.name,
            surname: user.surname,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.insert(id, user.clone());
        Ok(Some(user))
    }

    async fn tag_by_id(&self, id: i64) -> anyhow::Result<Option<Tag>> {
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn tag_by_name(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.name == name).cloned())
    }

    async fn list_tags(&self, page: Page) -> anyhow::Result<Vec<Tag>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.tags.values().cloned(), page))
    }

    async fn insert_tag(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        let mut tables = self.tables.write().await;
        if tables.tag_id_by_name(name).is_some() {
            return Ok(None);
        }
        let id = tables.ensure_tag(name);
        Ok(Some(Tag {
            id,
            name: name.to_string(),
        }))
    }

    async fn delete_tag(&self, id: i64) -> anyhow::Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.tags.remove(&id).is_none() {
            return Ok(false);
        }
        for certificate in tables.certificates.values_mut() {
            certificate.tag_ids.remove(&id);
        }
        Ok(true)
    }

    async fn most_popular_tag_of_top_customer(&self) -> anyhow::Result<Option<Tag>> {
        let tables = self.tables.read().await;

        // Summed in i128; a few large prices already exceed i64.
        let mut totals: BTreeMap<i64, i128> = BTreeMap::new();
        for order in tables.orders.values() {
            *totals.entry(order.user_id).or_default() += i128::from(order.cost);
        }
        // Highest total wins; equal totals go to the lowest user id.
        let top_user = totals
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(user_id, _)| *user_id);
        let Some(top_user) = top_user else {
            return Ok(None);
        };

        let mut usage: BTreeMap<i64, u64> = BTreeMap::new();
        for order in tables.orders.values().filter(|o| o.user_id == top_user) {
            if let Some(certificate) = tables.certificates.get(&order.certificate_id) {
                for tag_id in &certificate.tag_ids {
                    *usage.entry(*tag_id).or_default() += 1;
                }
            }
        }
        let top_tag = usage
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(tag_id, _)| *tag_id);

        Ok(top_tag.and_then(|id| tables.tags.get(&id).cloned()))
    }

    async fn certificate_by_id(&self, id: i64) -> anyhow::Result<Option<Certificate>> {
        let tables = self.tables.read().await;
        Ok(tables
            .certificates
            .get(&id)
            .map(|row| tables.hydrate_certificate(row)))
    }

    async fn search_certificates(
        &self,
        filter: &CertificateFilter,
        page: Page,
    ) -> anyhow::Result<Vec<Certificate>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Certificate> = tables
            .certificates
            .values()
            .map(|row| tables.hydrate_certificate(row))
            .filter(|c| filter.matches(c))
            .collect();

        if let Some(sort) = filter.sort {
            found.sort_by(|a, b| {
                let primary = match sort.field {
                    SortField::Name => a.name.cmp(&b.name),
                    SortField::CreateDate => a.create_date.cmp(&b.create_date),
                };
                let primary = match sort.order {
                    SortOrder::Asc => primary,
                    SortOrder::Desc => primary.reverse(),
                };
                match primary {
                    Ordering::Equal => a.id.cmp(&b.id),
                    other => other,
                }
            });
        }

        Ok(paginate(found.into_iter(), page))
    }

    async fn insert_certificate(
        &self,
        draft: &CertificateDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Certificate> {
        let mut tables = self.tables.write().await;
        let tag_ids: BTreeSet<i64> = draft
            .tags
            .iter()
            .map(|name| tables.ensure_tag(name))
            .collect();
        let id = next_id(&mut tables.certificate_seq);
        let row = CertificateRow {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            price: draft.price,
            duration: draft.duration,
            create_date: now,
            last_update_date: now,
            tag_ids,
        };
        let certificate = tables.hydrate_certificate(&row);
        tables.certificates.insert(id, row);
        Ok(certificate)
    }

    async fn update_certificate(
        &self,
        id: i64,
        patch: &CertificatePatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Certificate>> {
        let mut tables = self.tables.write().await;
        if !tables.certificates.contains_key(&id) {
            return Ok(None);
        }

        let new_tag_ids: Option<BTreeSet<i64>> = patch
            .tags
            .as_ref()
            .map(|names| names.iter().map(|name| tables.ensure_tag(name)).collect());

        let Some(row) = tables.certificates.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(description) = &patch.description {
            row.description = description.clone();
        }
        if let Some(price) = patch.price {
            row.price = price;
        }
        if let Some(duration) = patch.duration {
            row.duration = duration;
        }
        if let Some(tag_ids) = new_tag_ids {
            row.tag_ids = tag_ids;
        }
        row.last_update_date = now;

        Ok(tables
            .certificates
            .get(&id)
            .map(|row| tables.hydrate_certificate(row)))
    }

    async fn delete_certificate(&self, id: i64) -> anyhow::Result<CertificateRemoval> {
        let mut tables = self.tables.write().await;
        if !tables.certificates.contains_key(&id) {
            return Ok(CertificateRemoval::Missing);
        }
        if tables.orders.values().any(|o| o.certificate_id == id) {
            return Ok(CertificateRemoval::Ordered);
        }
        tables.certificates.remove(&id);
        Ok(CertificateRemoval::Deleted)
    }

    async fn insert_order(
        &self,
        user_id: i64,
        certificate_id: i64,
        cost: i64,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<Order> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.order_seq);
        let row = OrderRow {
            id,
            user_id,
            certificate_id,
            cost,
            timestamp,
        };
        let order = tables.hydrate_order(&row)?;
        tables.orders.insert(id, row);
        Ok(order)
    }

    async fn order_by_id(&self, id: i64) -> anyhow::Result<Option<Order>> {
        let tables = self.tables.read().await;
        tables
            .orders
            .get(&id)
            .map(|row| tables.hydrate_order(row))
            .transpose()
    }

    async fn orders_by_user(&self, user_id: i64, page: Page) -> anyhow::Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let rows = paginate(
            tables.orders.values().filter(|o| o.user_id == user_id),
            page,
        );
        rows.into_iter().map(|row| tables.hydrate_order(row)).collect()
    }
}
