//! Gift certificate use cases: CRUD and filtered search.

use super::tag_service::normalize_tag_name;
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{
    Certificate, CertificateDraft, CertificateFilter, CertificatePatch, Page,
};
use crate::storage::{CertificateRemoval, MarketplaceStore};
use chrono::Utc;
use std::sync::Arc;

fn validate_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidParameter(format!(
            "{} must not be blank",
            field
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: i64) -> ServiceResult<i64> {
    if price <= 0 {
        return Err(ServiceError::InvalidParameter(
            "price must be positive".to_string(),
        ));
    }
    Ok(price)
}

fn validate_duration(duration: i32) -> ServiceResult<i32> {
    if duration <= 0 {
        return Err(ServiceError::InvalidParameter(
            "duration must be positive".to_string(),
        ));
    }
    Ok(duration)
}

/// Trims names and drops duplicates, keeping first-seen order.
fn normalize_tag_names(names: &[String]) -> ServiceResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = normalize_tag_name(name)?;
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn MarketplaceStore>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn read(&self, id: i64) -> ServiceResult<Certificate> {
        self.store
            .certificate_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("certificate", id))
    }

    pub async fn create(&self, draft: CertificateDraft) -> ServiceResult<Certificate> {
        let draft = CertificateDraft {
            name: validate_text("name", &draft.name)?,
            description: validate_text("description", &draft.description)?,
            price: validate_price(draft.price)?,
            duration: validate_duration(draft.duration)?,
            tags: normalize_tag_names(&draft.tags)?,
        };
        let certificate = self.store.insert_certificate(&draft, Utc::now()).await?;
        tracing::debug!(
            certificate_id = certificate.id,
            tags = certificate.tags.len(),
            "certificate created"
        );
        Ok(certificate)
    }

    /// Applies only the provided fields. An empty patch is rejected.
    pub async fn update(&self, id: i64, patch: CertificatePatch) -> ServiceResult<Certificate> {
        if patch.is_empty() {
            return Err(ServiceError::InvalidParameter(
                "nothing to update".to_string(),
            ));
        }
        let patch = CertificatePatch {
            name: patch.name.as_deref().map(|n| validate_text("name", n)).transpose()?,
            description: patch
                .description
                .as_deref()
                .map(|d| validate_text("description", d))
                .transpose()?,
            price: patch.price.map(validate_price).transpose()?,
            duration: patch.duration.map(validate_duration).transpose()?,
            tags: patch
                .tags
                .as_deref()
                .map(normalize_tag_names)
                .transpose()?,
        };

        let updated = self
            .store
            .update_certificate(id, &patch, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::not_found("certificate", id))?;
        tracing::debug!(certificate_id = id, "certificate updated");
        Ok(updated)
    }

    /// Certificates that were already ordered cannot be deleted.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        match self.store.delete_certificate(id).await? {
            CertificateRemoval::Deleted => {
                tracing::debug!(certificate_id = id, "certificate deleted");
                Ok(())
            }
            CertificateRemoval::Missing => Err(ServiceError::not_found("certificate", id)),
            CertificateRemoval::Ordered => Err(ServiceError::Conflict(format!(
                "Certificate {} has orders and cannot be deleted",
                id
            ))),
        }
    }

    pub async fn search(
        &self,
        filter: CertificateFilter,
        page: Page,
    ) -> ServiceResult<Vec<Certificate>> {
        let filter = CertificateFilter {
            tags: normalize_tag_names(&filter.tags)?,
            search: filter
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sort: filter.sort,
        };
        Ok(self.store.search_certificates(&filter, page).await?)
    }
}
