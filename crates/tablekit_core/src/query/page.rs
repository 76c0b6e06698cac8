//! Paginated query results.

use serde::Serialize;

/// One page of query results.
///
/// `num_pages` is `ceil(total / per_page)` and `0` for an empty result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub num_pages: u64,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    /// Matching rows across all pages.
    pub total: u64,
}

impl<R> Page<R> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.num_pages
    }

    pub fn map<U>(self, f: impl FnMut(R) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            num_pages: self.num_pages,
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

/// Number of pages needed for `total` rows at `per_page` rows each.
pub(crate) fn page_count(total: u64, per_page: u32) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(u64::from(per_page))
}

/// Row offset of the first item on 1-based `page`.
pub(crate) fn page_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page)
}

#[cfg(test)]
mod tests {
    use super::{page_count, page_offset, Page};

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 4), 8);
    }

    #[test]
    fn navigation_flags_follow_position() {
        let page = Page {
            items: vec![1, 2],
            num_pages: 3,
            page: 2,
            per_page: 2,
            total: 6,
        };
        assert!(page.has_prev());
        assert!(page.has_next());

        let last = page.map(|item| item * 10);
        assert_eq!(last.items, vec![10, 20]);
        assert_eq!(last.num_pages, 3);
    }
}
