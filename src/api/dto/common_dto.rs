//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 200). Defaults to 50.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Clamps `page` to at least 1 and `per_page` to 1..=200.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 200),
        }
    }

    /// Builds the response metadata and slices one page out of `items`.
    pub fn page_of<T: Clone>(&self, items: &[T]) -> (Vec<T>, PaginationMeta) {
        let params = self.clamped();
        let total = items.len() as u32;
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(params.per_page)
        };
        // Offset in u64: a hostile page/per_page pair must yield an
        // empty page, not an arithmetic overflow.
        let start = (u64::from(params.page) - 1) * u64::from(params.per_page);
        let data = items
            .iter()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .take(params.per_page as usize)
            .cloned()
            .collect();
        (
            data,
            PaginationMeta {
                page: params.page,
                per_page: params.per_page,
                total,
                total_pages,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_bounds_inputs() {
        let params = PaginationParams {
            page: 0,
            per_page: 9_999,
        };
        let clamped = params.clamped();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, 200);
    }

    #[test]
    fn page_of_slices_and_counts() {
        let items: Vec<u32> = (0..120).collect();
        let params = PaginationParams {
            page: 2,
            per_page: 50,
        };
        let (data, meta) = params.page_of(&items);
        assert_eq!(data.first(), Some(&50));
        assert_eq!(data.len(), 50);
        assert_eq!(meta.total, 120);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn extreme_page_numbers_yield_an_empty_page() {
        let items: Vec<u32> = (0..10).collect();
        let params = PaginationParams {
            page: u32::MAX,
            per_page: 200,
        };
        let (data, meta) = params.page_of(&items);
        assert!(data.is_empty());
        assert_eq!(meta.total, 10);
        assert_eq!(meta.page, u32::MAX);
    }

    #[test]
    fn empty_collection_has_zero_pages() {
        let items: Vec<u32> = vec![];
        let (data, meta) = PaginationParams::default().page_of(&items);
        assert!(data.is_empty());
        assert_eq!(meta.total_pages, 0);
    }
}
