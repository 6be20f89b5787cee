use serde::{Deserialize, Serialize};

use crate::error::{PillsureError, Result};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Pagination block attached to every list response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(limit as u64);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: (page as u64) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Reject out-of-range paging parameters before touching the database.
pub fn validate_paging(page: u32, limit: u32) -> Result<()> {
    if page < 1 {
        return Err(PillsureError::BadRequest(
            "Page must be greater than 0".to_string(),
        ));
    }
    if limit < 1 || limit > MAX_LIMIT {
        return Err(PillsureError::BadRequest(format!(
            "Limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(())
}

pub fn offset(page: u32, limit: u32) -> u64 {
    (page.saturating_sub(1) as u64) * (limit as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);

        let last = Pagination::new(4, 10, 35);
        assert!(!last.has_next_page);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1, 10), 0);
        assert_eq!(offset(3, 25), 50);
    }

    #[test]
    fn test_validate_paging() {
        assert!(validate_paging(1, 10).is_ok());
        assert!(validate_paging(1, 100).is_ok());
        assert!(validate_paging(0, 10).is_err());
        assert!(validate_paging(1, 0).is_err());
        assert!(validate_paging(1, 101).is_err());
    }
}
