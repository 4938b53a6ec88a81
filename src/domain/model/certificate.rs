use super::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Gift certificate. `price` is in minor currency units, `duration` in days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration: i32,
    pub create_date: DateTime<Utc>,
    pub last_update_date: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

impl Certificate {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}

/// Certificate to create. Tags are referenced by name; missing tags are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDraft {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration: i32,
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves a field untouched; `tags: Some(..)` replaces the tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration: Option<i32>,
    pub tags: Option<Vec<String>>,
}

impl CertificatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.duration.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    CreateDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

/// Certificate search criteria. All criteria are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateFilter {
    /// The certificate must carry every one of these tags.
    pub tags: Vec<String>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    /// `None` orders by id ascending.
    pub sort: Option<SortSpec>,
}

impl CertificateFilter {
    /// In-process evaluation of the filter, used by the memory store.
    pub fn matches(&self, certificate: &Certificate) -> bool {
        if !self.tags.iter().all(|t| certificate.has_tag(t)) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                certificate.name.to_lowercase().contains(&needle)
                    || certificate.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate(name: &str, description: &str, tags: &[&str]) -> Certificate {
        let now = Utc::now();
        Certificate {
            id: 1,
            name: name.to_string(),
            description: description.to_string(),
            price: 1000,
            duration: 30,
            create_date: now,
            last_update_date: now,
            tags: tags
                .iter()
                .enumerate()
                .map(|(i, t)| Tag {
                    id: i as i64 + 1,
                    name: t.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn filter_requires_every_tag() {
        let cert = certificate("Spa day", "Relax", &["spa", "gift"]);
        let both = CertificateFilter {
            tags: vec!["spa".into(), "gift".into()],
            ..Default::default()
        };
        let extra = CertificateFilter {
            tags: vec!["spa".into(), "travel".into()],
            ..Default::default()
        };
        assert!(both.matches(&cert));
        assert!(!extra.matches(&cert));
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_description() {
        let cert = certificate("Spa day", "Full body MASSAGE", &[]);
        let by_desc = CertificateFilter {
            search: Some("massage".into()),
            ..Default::default()
        };
        let by_name = CertificateFilter {
            search: Some("SPA".into()),
            ..Default::default()
        };
        let miss = CertificateFilter {
            search: Some("skydiving".into()),
            ..Default::default()
        };
        assert!(by_desc.matches(&cert));
        assert!(by_name.matches(&cert));
        assert!(!miss.matches(&cert));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(CertificatePatch::default().is_empty());
        let patch = CertificatePatch {
            price: Some(10),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
