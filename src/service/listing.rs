use crate::connection::pool::ConnectionPool;
use crate::core::{Field, Result};
use crate::model::Project;
use crate::query::{
    ListParams, Pagination, QueryBuilder, SortKey, SortSpec, active_filter, overdue_filter,
    upcoming_filter,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Aggregate counts reported with every listing, independent of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counts {
    pub total: u64,
    pub filtered: u64,
    pub active: u64,
    pub upcoming: u64,
}

/// One page of projects plus counts and pagination metadata.
#[derive(Debug, Clone)]
pub struct Listing {
    pub data: Vec<Project>,
    pub counts: Counts,
    pub pagination: Pagination,
    /// Reference instant the filters were evaluated at.
    pub as_of: DateTime<Utc>,
}

pub struct ListingService {
    pool: Arc<ConnectionPool>,
    builder: QueryBuilder,
}

impl ListingService {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self::with_builder(pool, QueryBuilder::new())
    }

    pub fn with_builder(pool: Arc<ConnectionPool>, builder: QueryBuilder) -> Self {
        Self { pool, builder }
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub async fn list(&self, params: &ListParams) -> Result<Listing> {
        self.list_at(params, Utc::now()).await
    }

    /// Lists against an explicit reference instant.
    ///
    /// The page and all four counts come from one read of the collection, so
    /// they are mutually consistent.
    pub async fn list_at(&self, params: &ListParams, now: DateTime<Utc>) -> Result<Listing> {
        let query = self.builder.build(params, now)?;
        let upcoming = upcoming_filter(now);
        let active = active_filter();

        let (data, counts) = self
            .pool
            .run(|conn| {
                let (query, upcoming, active) = (&query, &upcoming, &active);
                async move {
                    conn.read(|c| {
                        let data = c.find(
                            &query.filter,
                            &query.sort,
                            query.page.skip(),
                            query.page.limit(),
                        );
                        let counts = Counts {
                            total: c.len() as u64,
                            filtered: c.count(&query.filter) as u64,
                            active: c.count(active) as u64,
                            upcoming: c.count(upcoming) as u64,
                        };
                        (data, counts)
                    })
                    .await
                }
            })
            .await?;

        let pagination = Pagination::new(query.page, counts.filtered);
        debug!(
            page = pagination.page,
            limit = pagination.limit,
            filtered = counts.filtered,
            returned = data.len(),
            "Listed projects"
        );

        Ok(Listing {
            data,
            counts,
            pagination,
            as_of: now,
        })
    }

    pub async fn overdue(&self) -> Result<Vec<Project>> {
        self.overdue_at(Utc::now()).await
    }

    /// Projects past their deadline that are not completed, earliest first.
    pub async fn overdue_at(&self, now: DateTime<Utc>) -> Result<Vec<Project>> {
        let filter = overdue_filter(now);
        let sort = SortSpec::new(vec![SortKey::asc(Field::Deadline)]);

        self.pool
            .run(|conn| {
                let (filter, sort) = (&filter, &sort);
                async move { conn.read(|c| c.find_all(filter, sort)).await }
            })
            .await
    }

    /// Number of stored projects.
    pub async fn total(&self) -> Result<u64> {
        self.pool
            .run(|conn| async move { conn.read(|c| c.len() as u64).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::config::ConnectionConfig;
    use crate::core::DeskError;
    use crate::model::ProjectStatus;
    use chrono::Duration;
    use uuid::Uuid;

    async fn service_with(projects: Vec<Project>) -> ListingService {
        let pool = Arc::new(ConnectionPool::new(ConnectionConfig::new()).await.unwrap());
        for project in projects {
            pool.store().insert_with(|id| Project { id, ..project }).await.unwrap();
        }
        ListingService::new(pool)
    }

    fn project(name: &str, status: ProjectStatus, deadline: DateTime<Utc>, created: i64) -> Project {
        let created_at = Utc::now() - Duration::days(30) + Duration::minutes(created);
        Project {
            id: Uuid::nil(),
            name: name.to_string(),
            description: None,
            status,
            deadline,
            assigned_to: "Alice".to_string(),
            budget: 100.0,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_counts_are_independent_of_page() {
        let now = Utc::now();
        let service = service_with(vec![
            project("Soon", ProjectStatus::Active, now + Duration::days(2), 1),
            project("Later", ProjectStatus::Active, now + Duration::days(20), 2),
            project("Done", ProjectStatus::Completed, now + Duration::days(1), 3),
            project("Paused", ProjectStatus::OnHold, now + Duration::days(3), 4),
        ])
        .await;

        let listing = service
            .list_at(&ListParams::new().status("completed").limit(1), now)
            .await
            .unwrap();
        assert_eq!(
            listing.counts,
            Counts {
                total: 4,
                filtered: 1,
                active: 2,
                upcoming: 1
            }
        );
        assert_eq!(listing.data.len(), 1);
        assert_eq!(listing.data[0].name, "Done");
    }

    #[tokio::test]
    async fn test_default_order_is_newest_first() {
        let now = Utc::now();
        let deadline = now + Duration::days(5);
        let service = service_with(vec![
            project("First", ProjectStatus::Active, deadline, 1),
            project("Second", ProjectStatus::Active, deadline, 2),
            project("Third", ProjectStatus::Active, deadline, 3),
        ])
        .await;

        let listing = service.list_at(&ListParams::new(), now).await.unwrap();
        let names: Vec<_> = listing.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "Second", "First"]);
        assert_eq!(listing.pagination.pages, 1);
    }

    #[tokio::test]
    async fn test_empty_result_has_zero_pages() {
        let service = service_with(vec![]).await;
        let listing = service.list(&ListParams::new().search("nothing")).await.unwrap();
        assert!(listing.data.is_empty());
        assert_eq!(listing.pagination.total, 0);
        assert_eq!(listing.pagination.pages, 0);
    }

    #[tokio::test]
    async fn test_malformed_params_are_rejected() {
        let service = service_with(vec![]).await;
        let result = service.list(&ListParams::new().order("up")).await;
        assert!(matches!(result, Err(DeskError::MalformedRequest(_))));
    }

    #[tokio::test]
    async fn test_overdue_excludes_completed() {
        let now = Utc::now();
        let service = service_with(vec![
            project("Late", ProjectStatus::Active, now - Duration::days(2), 1),
            project("Later", ProjectStatus::OnHold, now - Duration::days(5), 2),
            project("Finished", ProjectStatus::Completed, now - Duration::days(3), 3),
            project("Fine", ProjectStatus::Active, now + Duration::days(3), 4),
        ])
        .await;

        let overdue = service.overdue_at(now).await.unwrap();
        let names: Vec<_> = overdue.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Later", "Late"]);
    }
}
