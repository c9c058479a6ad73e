use serde::Serialize;

/// Requested pagination window. Both values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// `(page - 1) * limit`
    pub fn skip(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    pub fn limit(&self) -> usize {
        self.limit as usize
    }
}

/// Pagination metadata returned with a listing.
///
/// `total` is the filtered count. `pages = ceil(total / limit)`, which is 0
/// when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, filtered: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total: filtered,
            pages: filtered.div_ceil(u64::from(request.limit)),
        }
    }
}
