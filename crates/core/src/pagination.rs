//! Offset pagination and sorting for list endpoints.

use serde::{Deserialize, Serialize};

/// A requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u32 = 25;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Normalize raw query values. Missing values fall back to the first
    /// page of [`Self::DEFAULT_PER_PAGE`] rows.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// SQL keyword for `ORDER BY`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> i64 {
        if self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page.max(1));
        (self.total + per_page - 1) / per_page
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        i64::from(self.page) < self.total_pages()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamps() {
        assert_eq!(PageRequest::default(), PageRequest { page: 1, per_page: 25 });
        assert_eq!(
            PageRequest::new(Some(0), Some(0)),
            PageRequest { page: 1, per_page: 1 }
        );
        assert_eq!(PageRequest::new(Some(3), Some(500)).per_page, 100);
    }

    #[test]
    fn test_offset_and_limit() {
        let request = PageRequest::new(Some(3), Some(20));
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn test_total_pages() {
        let request = PageRequest::new(Some(1), Some(10));
        assert_eq!(Page::<()>::new(vec![], request, 0).total_pages(), 0);
        assert_eq!(Page::<()>::new(vec![], request, 10).total_pages(), 1);
        assert_eq!(Page::<()>::new(vec![], request, 11).total_pages(), 2);
    }

    #[test]
    fn test_next_and_previous() {
        let first = Page::<()>::new(vec![], PageRequest::new(Some(1), Some(10)), 25);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = Page::<()>::new(vec![], PageRequest::new(Some(3), Some(10)), 25);
        assert!(!last.has_next());
        assert!(last.has_previous());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], PageRequest::new(Some(2), Some(2)), 4);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.page, 2);
        assert_eq!(mapped.total, 4);
    }

    #[test]
    fn test_sort_direction_sql() {
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
        assert_eq!(SortDirection::Asc.reverse(), SortDirection::Desc);
        let parsed: SortDirection = serde_json::from_str("\"desc\"").unwrap_or_default();
        assert_eq!(parsed, SortDirection::Desc);
    }
}
