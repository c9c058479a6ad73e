use super::{Filter, ListParams, PageRequest, SortKey, SortSpec};
use crate::core::{DeskError, Field, Result};
use crate::model::ProjectStatus;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// A fully resolved listing query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectQuery {
    pub filter: Filter,
    pub sort: SortSpec,
    pub page: PageRequest,
}

/// `status = active`
pub fn active_filter() -> Filter {
    Filter::eq(Field::Status, ProjectStatus::Active.as_str())
}

/// `status = active AND deadline ∈ [now, now + 7 days)`
pub fn upcoming_filter(now: DateTime<Utc>) -> Filter {
    Filter::all_of(vec![
        active_filter(),
        Filter::range(
            Field::Deadline,
            now,
            now + Duration::days(UPCOMING_WINDOW_DAYS),
        ),
    ])
}

/// `deadline < now AND status != completed`
pub fn overdue_filter(now: DateTime<Utc>) -> Filter {
    Filter::all_of(vec![
        Filter::compare(Field::Deadline, super::CompareOp::Lt, now),
        Filter::compare(
            Field::Status,
            super::CompareOp::NotEq,
            ProjectStatus::Completed.as_str(),
        ),
    ])
}

/// Parses listing parameters into a [`ProjectQuery`].
///
/// The reference instant is an explicit argument, so identical parameters and
/// instant always produce an identical query.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    default_limit: u32,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            default_limit: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn build(&self, params: &ListParams, now: DateTime<Utc>) -> Result<ProjectQuery> {
        let page = parse_positive("page", present(&params.page))?.unwrap_or(1);
        let limit = parse_positive("limit", present(&params.limit))?.unwrap_or(self.default_limit);
        if limit > MAX_PAGE_SIZE {
            return Err(DeskError::malformed(format!(
                "limit must not exceed {}",
                MAX_PAGE_SIZE
            )));
        }

        let active_only = parse_flag("activeOnly", present(&params.active_only))?;
        let upcoming = parse_flag("upcomingDeadlines", present(&params.upcoming_deadlines))?;
        let status = present(&params.status)
            .map(|raw| raw.parse::<ProjectStatus>().map_err(DeskError::MalformedRequest))
            .transpose()?;

        let mut conditions = Vec::new();
        if upcoming {
            conditions.push(upcoming_filter(now));
        } else if active_only {
            conditions.push(active_filter());
        } else if let Some(status) = status {
            conditions.push(Filter::eq(Field::Status, status.as_str()));
        }
        if let Some(assignee) = present(&params.assigned_to) {
            conditions.push(Filter::eq(Field::AssignedTo, assignee));
        }
        if let Some(needle) = present(&params.search) {
            conditions.push(Filter::search(
                vec![Field::Name, Field::Description],
                needle,
            ));
        }

        Ok(ProjectQuery {
            filter: Filter::all_of(conditions),
            sort: parse_sort(present(&params.sort_by), present(&params.order))?,
            page: PageRequest::new(page, limit),
        })
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Empty values count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_positive(name: &str, raw: Option<&str>) -> Result<Option<u32>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(DeskError::malformed(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(DeskError::malformed(format!(
            "{} must be true or false, got '{}'",
            name, raw
        ))),
    }
}

fn parse_sort(sort_by: Option<&str>, order: Option<&str>) -> Result<SortSpec> {
    let descending = match order.map(|o| o.trim().to_ascii_lowercase()) {
        None => None,
        Some(o) if o == "asc" => Some(false),
        Some(o) if o == "desc" => Some(true),
        Some(o) => {
            return Err(DeskError::malformed(format!(
                "order must be asc or desc, got '{}'",
                o
            )));
        }
    };

    let Some(sort_by) = sort_by else {
        return Ok(SortSpec::new(vec![SortKey::new(
            Field::CreatedAt,
            descending.unwrap_or(true),
        )]));
    };

    let field = sort_by
        .trim()
        .parse::<Field>()
        .ok()
        .filter(Field::is_sortable)
        .ok_or_else(|| DeskError::malformed(format!("cannot sort by '{}'", sort_by)))?;

    Ok(SortSpec::new(vec![SortKey::new(
        field,
        descending.unwrap_or(false),
    )]))
}
