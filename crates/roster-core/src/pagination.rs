//! Page-based pagination for list endpoints.
//!
//! Clients send `page` (1-indexed) and `rows` (items per page) as query
//! parameters. Both are optional and fall back to page 1 with 10 rows.
//!
//! # Example
//!
//! ```ignore
//! use roster_core::pagination::Page;
//!
//! let page = Page::parse(Some("2"), Some("25"))?;
//! assert_eq!(page.offset(), 25);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_ROWS: i64 = 10;
pub const MAX_ROWS: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page conversion: {0}")]
    InvalidPage(String),
    #[error("rows conversion: {0}")]
    InvalidRows(String),
    #[error("page value too small, must be larger than 0")]
    PageTooSmall,
    #[error("page value too big, offset out of range")]
    PageTooBig,
    #[error("rows value too small, must be larger than 0")]
    RowsTooSmall,
    #[error("rows value too big, must be less than {MAX_ROWS}")]
    RowsTooBig,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    number: i64,
    rows: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE,
            rows: DEFAULT_ROWS,
        }
    }
}

impl Page {
    /// Parses raw `page` and `rows` query values.
    ///
    /// Missing or empty values use the defaults. Values must be positive
    /// integers and `rows` may not exceed [`MAX_ROWS`].
    pub fn parse(page: Option<&str>, rows: Option<&str>) -> Result<Self, PageError> {
        let number = match page.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| PageError::InvalidPage(e.to_string()))?,
            None => DEFAULT_PAGE,
        };

        let rows = match rows.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| PageError::InvalidRows(e.to_string()))?,
            None => DEFAULT_ROWS,
        };

        Self::new(number, rows)
    }

    pub fn new(number: i64, rows: i64) -> Result<Self, PageError> {
        if number <= 0 {
            return Err(PageError::PageTooSmall);
        }
        if rows <= 0 {
            return Err(PageError::RowsTooSmall);
        }
        if rows > MAX_ROWS {
            return Err(PageError::RowsTooBig);
        }
        if (number - 1).checked_mul(rows).is_none() {
            return Err(PageError::PageTooBig);
        }

        Ok(Self { number, rows })
    }

    #[must_use]
    pub fn number(&self) -> i64 {
        self.number
    }

    #[must_use]
    pub fn rows(&self) -> i64 {
        self.rows
    }

    /// Number of rows to skip before this page starts. Cannot overflow, since
    /// [`Page::new`] rejects pages whose offset does not fit in an `i64`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.rows
    }
}

/// Envelope for a page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub rows_per_page: i64,
    pub has_more: bool,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: i64, page: &Page) -> Self {
        let has_more = page.offset().saturating_add(items.len() as i64) < total;
        Self {
            items,
            total,
            page: page.number(),
            rows_per_page: page.rows(),
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let page = Page::parse(None, None).unwrap();
        assert_eq!(page.number(), 1);
        assert_eq!(page.rows(), 10);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_parse_empty_strings_use_defaults() {
        let page = Page::parse(Some(""), Some("")).unwrap();
        assert_eq!(page, Page::default());
    }

    #[test]
    fn test_parse_explicit_values() {
        let page = Page::parse(Some("3"), Some("20")).unwrap();
        assert_eq!(page.number(), 3);
        assert_eq!(page.rows(), 20);
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!(
            Page::parse(Some("abc"), None),
            Err(PageError::InvalidPage(_))
        ));
        assert!(matches!(
            Page::parse(None, Some("ten")),
            Err(PageError::InvalidRows(_))
        ));
    }

    #[test]
    fn test_parse_rejects_zero_and_negative() {
        assert_eq!(Page::parse(Some("0"), None), Err(PageError::PageTooSmall));
        assert_eq!(Page::parse(None, Some("-1")), Err(PageError::RowsTooSmall));
    }

    #[test]
    fn test_parse_rows_upper_bound() {
        assert!(Page::parse(None, Some("100")).is_ok());
        assert_eq!(Page::parse(None, Some("101")), Err(PageError::RowsTooBig));
    }

    #[test]
    fn test_parse_rejects_offset_overflow() {
        assert_eq!(
            Page::parse(Some("9223372036854775807"), Some("10")),
            Err(PageError::PageTooBig)
        );
        assert_eq!(Page::new(i64::MAX, 2), Err(PageError::PageTooBig));

        // One row per page never overflows.
        let last = Page::new(i64::MAX, 1).unwrap();
        assert_eq!(last.offset(), i64::MAX - 1);
    }

    #[test]
    fn test_page_result_near_max_offset() {
        let page = Page::new(i64::MAX, 1).unwrap();
        let result = PageResult::new(vec![1, 2], 3, &page);
        assert!(!result.has_more);
    }

    #[test]
    fn test_page_result_has_more() {
        let page = Page::new(1, 2).unwrap();
        let result = PageResult::new(vec![1, 2], 5, &page);
        assert!(result.has_more);
        assert_eq!(result.rows_per_page, 2);

        let last = Page::new(3, 2).unwrap();
        let result = PageResult::new(vec![5], 5, &last);
        assert!(!result.has_more);
    }
}
