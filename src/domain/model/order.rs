use super::{Certificate, User};
use chrono::{DateTime, Utc};

/// A purchase of one certificate by one user.
///
/// `cost` is the certificate price at purchase time; later price changes do not touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub user: User,
    pub certificate: Certificate,
    pub cost: i64,
    pub timestamp: DateTime<Utc>,
}
