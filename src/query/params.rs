use serde::Deserialize;

/// Raw listing parameters as they arrive in a query string.
///
/// Everything is kept as text so that malformed values surface as a
/// `MalformedRequest` from [`QueryBuilder::build`] rather than as an
/// extractor rejection.
///
/// [`QueryBuilder::build`]: super::QueryBuilder::build
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
    pub active_only: Option<String>,
    pub upcoming_deadlines: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn active_only(mut self, flag: bool) -> Self {
        self.active_only = Some(flag.to_string());
        self
    }

    pub fn upcoming_deadlines(mut self, flag: bool) -> Self {
        self.upcoming_deadlines = Some(flag.to_string());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
}
