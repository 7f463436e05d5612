//! Paginated listing results

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page position and totals for one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    /// `total_pages` is `ceil(total_items / limit)`, so an empty listing has zero pages
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total_items.div_ceil(limit as u64) };
        Self {
            page,
            limit,
            total_pages,
            total_items,
            has_next_page: (page as u64) < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// Number of documents before this page
    pub fn skip(page: u32, limit: u32) -> u64 {
        (page.max(1) as u64 - 1).saturating_mul(limit as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T = Value> {
    pub documents: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated { documents: self.documents.into_iter().map(f).collect(), pagination: self.pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_pages_is_ceiling() {
        for (items, limit, pages) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (30, 12, 3)] {
            assert_eq!(PaginationMeta::new(1, limit, items).total_pages, pages, "{}/{}", items, limit);
        }
    }

    #[test]
    fn test_middle_page() {
        let meta = PaginationMeta::new(2, 12, 30);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);
        assert_eq!(PaginationMeta::skip(2, 12), 12);
    }

    #[test]
    fn test_page_past_the_end() {
        let meta = PaginationMeta::new(5, 10, 20);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);
    }

    #[test]
    fn test_serialized_shape() {
        let result: Paginated = Paginated { documents: vec![json!({"name": "A"})], pagination: PaginationMeta::new(1, 10, 1) };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "documents": [{"name": "A"}],
                "pagination": {
                    "page": 1, "limit": 10, "totalPages": 1, "totalItems": 1,
                    "hasNextPage": false, "hasPrevPage": false
                }
            })
        );
    }
}
