use crate::domain::error::ServiceError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
}

impl Page {
    /// Validates raw `page`/`size` query values, applying defaults for missing ones.
    pub fn new(number: Option<i64>, size: Option<i64>) -> Result<Self, ServiceError> {
        let number = number.unwrap_or(DEFAULT_PAGE);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if number < 1 {
            return Err(ServiceError::InvalidParameter(format!(
                "page must be >= 1 (got {})",
                number
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(ServiceError::InvalidParameter(format!(
                "size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, size
            )));
        }
        if (number - 1).checked_mul(size).is_none() {
            return Err(ServiceError::InvalidParameter(format!(
                "page {} is out of range for size {}",
                number, size
            )));
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    /// Rows to skip before this page starts. Cannot overflow; `new` rejects such pages.
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}
