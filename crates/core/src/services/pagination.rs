//! Pagination metadata.

use serde::Serialize;

/// Page metadata of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Rows matching the filter.
    pub total: u64,
    /// Current 1-based page.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// `ceil(total / limit)`.
    pub total_pages: u64,
    /// Next page, if any.
    pub next_page: Option<u64>,
    /// Previous page, if any.
    pub prev_page: Option<u64>,
    /// Absolute URL of the next page, filled in by the HTTP layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
    /// Absolute URL of the previous page, filled in by the HTTP layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page_url: Option<String>,
    /// Seed used for random ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<i64>,
}

impl PageMeta {
    /// Build metadata for `page` of a `total`-row listing.
    ///
    /// `limit` must be positive.
    #[must_use]
    pub const fn new(total: u64, page: u64, limit: u64, random_seed: Option<i64>) -> Self {
        let total_pages = total.div_ceil(limit);
        Self {
            total,
            page,
            limit,
            total_pages,
            next_page: if page < total_pages { Some(page + 1) } else { None },
            prev_page: if page > 1 { Some(page - 1) } else { None },
            next_page_url: None,
            prev_page_url: None,
            random_seed,
        }
    }
}
