//! PostgreSQL `MarketplaceStore` built on a sqlx connection pool.

use super::schema::{CREATE_STATEMENTS, TABLES};
use super::{CertificateRemoval, MarketplaceStore};
use crate::domain::model::{
    Certificate, CertificateDraft, CertificateFilter, CertificatePatch, NewUser, Order, Page,
    Role, SortField, SortOrder, Tag, User,
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::collections::HashMap;

const USER_COLUMNS: &str = "id, name, surname, email, password, role";
const CERTIFICATE_COLUMNS: &str =
    "c.id, c.name, c.description, c.price, c.duration, c.create_date, c.last_update_date";
const ORDER_COLUMNS: &str = "id, user_id, certificate_id, cost, purchase_date";

fn user_from_row(row: &PgRow) -> anyhow::Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        surname: row.try_get("surname")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        role: role.parse::<Role>().map_err(|e| anyhow!(e))?,
    })
}

fn tag_from_row(row: &PgRow) -> anyhow::Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

fn certificate_from_row(row: &PgRow, tags: Vec<Tag>) -> anyhow::Result<Certificate> {
    Ok(Certificate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        duration: row.try_get("duration")?,
        create_date: row.try_get("create_date")?,
        last_update_date: row.try_get("last_update_date")?,
        tags,
    })
}

/// Escapes `%`, `_` and `\` so user input matches literally inside an `ILIKE` pattern.
/// `foreign_key_violation` (23503), raised when a row is still referenced.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and makes sure the marketplace tables exist.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        let store = Self::from_pool(pool);
        store.bootstrap_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn bootstrap_schema(&self) -> anyhow::Result<()> {
        for statement in CREATE_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("schema bootstrap failed: {}", statement))?;
        }
        Ok(())
    }

    /// Wipes all marketplace data and resets id sequences.
    pub async fn clear_all(&self) -> anyhow::Result<()> {
        let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", TABLES.join(", "));
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Row count of every marketplace table, in [`TABLES`] order.
    pub async fn table_counts(&self) -> anyhow::Result<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
            counts.push((*table, count));
        }
        Ok(counts)
    }

    /// Loads certificates with their tags, preserving the order of `ids`.
    async fn load_certificates(&self, ids: &[i64]) -> anyhow::Result<Vec<Certificate>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let tag_rows = sqlx::query(
            "SELECT gct.certificate_id, t.id, t.name
             FROM gift_certificate_tags gct
             JOIN tags t ON t.id = gct.tag_id
             WHERE gct.certificate_id = ANY($1)
             ORDER BY t.id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags_by_certificate: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in &tag_rows {
            let certificate_id: i64 = row.try_get("certificate_id")?;
            tags_by_certificate
                .entry(certificate_id)
                .or_default()
                .push(tag_from_row(row)?);
        }

        let sql = format!(
            "SELECT {} FROM gift_certificates c WHERE c.id = ANY($1)",
            CERTIFICATE_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(ids).fetch_all(&self.pool).await?;

        let mut by_id: HashMap<i64, Certificate> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let tags = tags_by_certificate.remove(&id).unwrap_or_default();
            by_id.insert(id, certificate_from_row(row, tags)?);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Creates missing tags by name and links them to the certificate.
    async fn link_tags(
        tx: &mut Transaction<'_, Postgres>,
        certificate_id: i64,
        names: &[String],
    ) -> anyhow::Result<()> {
        for name in names {
            sqlx::query("INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(name)
                .execute(&mut **tx)
                .await?;
            sqlx::query(
                "INSERT INTO gift_certificate_tags (certificate_id, tag_id)
                 SELECT $1, id FROM tags WHERE name = $2
                 ON CONFLICT DO NOTHING",
            )
            .bind(certificate_id)
            .bind(name)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn hydrate_orders(&self, rows: Vec<PgRow>) -> anyhow::Result<Vec<Order>> {
        let mut users: HashMap<i64, User> = HashMap::new();
        let mut certificate_ids: Vec<i64> = Vec::with_capacity(rows.len());
        for row in &rows {
            let user_id: i64 = row.try_get("user_id")?;
            if !users.contains_key(&user_id) {
                let user = self
                    .user_by_id(user_id)
                    .await?
                    .ok_or_else(|| anyhow!("order references missing user {}", user_id))?;
                users.insert(user_id, user);
            }
            let certificate_id: i64 = row.try_get("certificate_id")?;
            if !certificate_ids.contains(&certificate_id) {
                certificate_ids.push(certificate_id);
            }
        }

        let certificates: HashMap<i64, Certificate> = self
            .load_certificates(&certificate_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let user_id: i64 = row.try_get("user_id")?;
            let certificate_id: i64 = row.try_get("certificate_id")?;
            let certificate = certificates
                .get(&certificate_id)
                .cloned()
                .ok_or_else(|| anyhow!("order references missing certificate {}", certificate_id))?;
            let user = users
                .get(&user_id)
                .cloned()
                .ok_or_else(|| anyhow!("order references missing user {}", user_id))?;
            orders.push(Order {
                id: row.try_get("id")?,
                user,
                certificate,
                cost: row.try_get("cost")?,
                timestamp: row.try_get("purchase_date")?,
            });
        }
        Ok(orders)
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self, page: Page) -> anyhow::Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(page.size())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO users (name, surname, email, password, role)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email) DO NOTHING
             RETURNING id",
        )
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(id) = id else {
            return Ok(None);
        };

        Ok(Some(User {
            id,
            name: user.name,
            surname: user.surname,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        }))
    }

    async fn tag_by_id(&self, id: i64) -> anyhow::Result<Option<Tag>> {
        sqlx::query("SELECT id, name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(tag_from_row)
            .transpose()
    }

    async fn tag_by_name(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        sqlx::query("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(tag_from_row)
            .transpose()
    }

    async fn list_tags(&self, page: Page) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name FROM tags ORDER BY id LIMIT $1 OFFSET $2")
            .bind(page.size())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(tag_from_row).collect()
    }

    async fn insert_tag(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        sqlx::query(
            "INSERT INTO tags (name) VALUES ($1)
             ON CONFLICT (name) DO NOTHING
             RETURNING id, name",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(tag_from_row)
        .transpose()
    }

    async fn delete_tag(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn most_popular_tag_of_top_customer(&self) -> anyhow::Result<Option<Tag>> {
        sqlx::query(
            "WITH top_customer AS (
                 SELECT user_id
                 FROM orders
                 GROUP BY user_id
                 ORDER BY SUM(cost) DESC, user_id ASC
                 LIMIT 1
             )
             SELECT t.id, t.name
             FROM orders o
             JOIN top_customer tc ON tc.user_id = o.user_id
             JOIN gift_certificate_tags gct ON gct.certificate_id = o.certificate_id
             JOIN tags t ON t.id = gct.tag_id
             GROUP BY t.id, t.name
             ORDER BY COUNT(*) DESC, t.id ASC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(tag_from_row)
        .transpose()
    }

    async fn certificate_by_id(&self, id: i64) -> anyhow::Result<Option<Certificate>> {
        Ok(self.load_certificates(&[id]).await?.pop())
    }

    async fn search_certificates(
        &self,
        filter: &CertificateFilter,
        page: Page,
    ) -> anyhow::Result<Vec<Certificate>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT c.id FROM gift_certificates c WHERE TRUE");

        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (c.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if !filter.tags.is_empty() {
            qb.push(
                " AND c.id IN (
                    SELECT gct.certificate_id
                    FROM gift_certificate_tags gct
                    JOIN tags t ON t.id = gct.tag_id
                    WHERE t.name = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push(
                ")
                    GROUP BY gct.certificate_id
                    HAVING COUNT(DISTINCT t.id) = ",
            )
            .push_bind(filter.tags.len() as i64)
            .push(")");
        }

        match filter.sort {
            Some(sort) => {
                qb.push(" ORDER BY ");
                qb.push(match sort.field {
                    SortField::Name => "c.name",
                    SortField::CreateDate => "c.create_date",
                });
                qb.push(match sort.order {
                    SortOrder::Asc => " ASC",
                    SortOrder::Desc => " DESC",
                });
                qb.push(", c.id ASC");
            }
            None => {
                qb.push(" ORDER BY c.id ASC");
            }
        }

        qb.push(" LIMIT ")
            .push_bind(page.size())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let ids: Vec<i64> = qb.build_query_scalar::<i64>().fetch_all(&self.pool).await?;
        self.load_certificates(&ids).await
    }

    async fn insert_certificate(
        &self,
        draft: &CertificateDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Certificate> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO gift_certificates
                 (name, description, price, duration, create_date, last_update_date)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING id",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.duration)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Self::link_tags(&mut tx, id, &draft.tags).await?;
        tx.commit().await?;

        self.certificate_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("certificate {} missing after insert", id))
    }

    async fn update_certificate(
        &self,
        id: i64,
        patch: &CertificatePatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Certificate>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE gift_certificates SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 duration = COALESCE($5, duration),
                 last_update_date = $6
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.duration)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(tags) = &patch.tags {
            sqlx::query("DELETE FROM gift_certificate_tags WHERE certificate_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::link_tags(&mut tx, id, tags).await?;
        }
        tx.commit().await?;

        self.certificate_by_id(id).await
    }

    async fn delete_certificate(&self, id: i64) -> anyhow::Result<CertificateRemoval> {
        let deleted = sqlx::query(
            "DELETE FROM gift_certificates c
             WHERE c.id = $1
               AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.certificate_id = c.id)",
        )
        .bind(id)
        .execute(&self.pool)
        .await;

        match deleted {
            Ok(result) if result.rows_affected() > 0 => Ok(CertificateRemoval::Deleted),
            Ok(_) => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM gift_certificates WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                Ok(if exists {
                    CertificateRemoval::Ordered
                } else {
                    CertificateRemoval::Missing
                })
            }
            // An order committed after the NOT EXISTS check still holds the row.
            Err(e) if is_foreign_key_violation(&e) => Ok(CertificateRemoval::Ordered),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_order(
        &self,
        user_id: i64,
        certificate_id: i64,
        cost: i64,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<Order> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (user_id, certificate_id, cost, purchase_date)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(user_id)
        .bind(certificate_id)
        .bind(cost)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;

        self.order_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("order {} missing after insert", id))
    }

    async fn order_by_id(&self, id: i64) -> anyhow::Result<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let Some(row) = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.hydrate_orders(vec![row]).await?.pop())
    }

    async fn orders_by_user(&self, user_id: i64, page: Page) -> anyhow::Result<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            ORDER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(page.size())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_orders(rows).await
    }
}
