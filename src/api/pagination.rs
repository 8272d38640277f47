use serde::Serialize;

/// Page size applied when a list request does not ask for one.
pub(crate) const DEFAULT_PAGE_SIZE: i64 = 100;

/// Hard ceiling on a single page; exam catalogs and attempt histories grow
/// without bound.
pub(crate) const MAX_PAGE_SIZE: i64 = 1000;

pub(crate) const fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Normalizes client paging input before it reaches a query.
pub(crate) fn clamp_page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, MAX_PAGE_SIZE))
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}
