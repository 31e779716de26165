use serde::Serialize;

pub const DEFAULT_PER_PAGE: u64 = 100;
pub const MAX_PER_PAGE: u64 = 200;
/// Highest accepted page number; keeps `page * per_page` well inside `i64`.
pub const MAX_PAGE: u64 = 1_000_000_000;

/// Requested page, 1-based and at most `MAX_PAGE`, with `per_page` clamped
/// to `1..=MAX_PER_PAGE`. Pages past the end are simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Lenient parsing of the raw query values; garbage falls back to defaults.
    pub fn from_query(page: Option<&str>, per_page: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p > 0)
            .map(|p| p.min(MAX_PAGE))
            .unwrap_or(1);
        let per_page = per_page
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p > 0)
            .map(|p| p.min(MAX_PER_PAGE))
            .unwrap_or(DEFAULT_PER_PAGE);
        Self { page, per_page }
    }

    /// Zero-based page index as used by SeaORM paginators.
    pub fn page_index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    pub fn info(&self, total_items: u64) -> PageInfo {
        let pages = total_items.div_ceil(self.per_page).max(1);
        PageInfo {
            page: self.page,
            per_page: self.per_page,
            total_items,
            pages,
            has_prev: self.page > 1,
            has_next: self.page < pages,
        }
    }
}

/// Navigation data for rendering a pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageInfo {
    /// Previous page, or the last one when `page` is past the end.
    pub fn prev_page(&self) -> u64 {
        self.page.saturating_sub(1).min(self.pages).max(1)
    }

    pub fn next_page(&self) -> u64 {
        (self.page + 1).min(self.pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        assert_eq!(Pagination::from_query(None, None), Pagination::default());
        assert_eq!(
            Pagination::from_query(Some("3"), Some("500")),
            Pagination { page: 3, per_page: MAX_PER_PAGE }
        );
        assert_eq!(
            Pagination::from_query(Some("0"), Some("abc")),
            Pagination { page: 1, per_page: DEFAULT_PER_PAGE }
        );
    }

    #[test]
    fn test_page_info() {
        let pagination = Pagination { page: 2, per_page: 100 };
        let info = pagination.info(250);
        assert_eq!(info.pages, 3);
        assert!(info.has_prev);
        assert!(info.has_next);
        assert_eq!(info.prev_page(), 1);
        assert_eq!(info.next_page(), 3);
        assert_eq!(pagination.page_index(), 1);

        let empty = Pagination::default().info(0);
        assert_eq!(empty.pages, 1);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_huge_page_is_capped() {
        let pagination = Pagination::from_query(Some("18446744073709551615"), Some("200"));
        assert_eq!(pagination.page, MAX_PAGE);
        let offset = pagination.page_index() * pagination.per_page;
        assert!(offset < i64::MAX as u64);

        let info = pagination.info(250);
        assert_eq!(info.pages, 2);
        assert!(info.has_prev);
        assert!(!info.has_next);
        assert_eq!(info.prev_page(), 2);
        assert_eq!(info.next_page(), 2);
    }
}
