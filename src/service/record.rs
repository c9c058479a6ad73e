use crate::connection::pool::ConnectionPool;
use crate::core::{DeskError, Result};
use crate::model::validation::{ProjectChanges, validate_changes, validate_new};
use crate::model::{Project, ProjectInput, ProjectStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Single-project create, fetch, update and delete.
pub struct RecordService {
    pool: Arc<ConnectionPool>,
}

impl RecordService {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: ProjectInput) -> Result<Project> {
        self.create_at(input, Utc::now()).await
    }

    /// Validates the full record, then stores it with `createdAt = updatedAt = now`.
    pub async fn create_at(&self, input: ProjectInput, now: DateTime<Utc>) -> Result<Project> {
        let new_project = validate_new(input, now)?;

        let project = self
            .pool
            .run(|conn| {
                let new_project = new_project.clone();
                async move { conn.insert_with(|id| new_project.into_project(id, now)).await }
            })
            .await?;

        info!(id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    /// A malformed id is reported as not found.
    pub async fn get(&self, id: &str) -> Result<Project> {
        let id = parse_id(id)?;
        self.pool
            .run(|conn| async move { conn.get(&id).await })
            .await?
            .ok_or_else(|| DeskError::not_found(id))
    }

    pub async fn update(&self, id: &str, input: ProjectInput) -> Result<Project> {
        let id = parse_id(id)?;
        let changes = validate_changes(input, Utc::now())?;
        self.apply(id, &changes).await
    }

    pub async fn mark_complete(&self, id: &str) -> Result<Project> {
        let id = parse_id(id)?;
        self.apply(id, &ProjectChanges::status_only(ProjectStatus::Completed))
            .await
    }

    /// Hard delete.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        let removed = self
            .pool
            .run(|conn| async move { conn.delete(&id).await })
            .await?;

        match removed {
            Some(project) => {
                info!(id = %project.id, "Project deleted");
                Ok(())
            }
            None => Err(DeskError::not_found(id)),
        }
    }

    async fn apply(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project> {
        let project = self
            .pool
            .run(|conn| async move {
                conn.update_with(&id, |current| {
                    Ok(changes.apply(current, current.next_update_stamp(Utc::now())))
                })
                .await
            })
            .await?;

        debug!(id = %project.id, updated_at = %project.updated_at, "Project updated");
        Ok(project)
    }
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| DeskError::not_found(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::config::ConnectionConfig;
    use crate::model::validation::{BUDGET_NEGATIVE, DEADLINE_NOT_FUTURE, NAME_REQUIRED};
    use chrono::Duration;

    async fn service() -> RecordService {
        let pool = ConnectionPool::new(ConnectionConfig::new()).await.unwrap();
        RecordService::new(Arc::new(pool))
    }

    fn alpha() -> ProjectInput {
        ProjectInput::new()
            .name("  Alpha  ")
            .deadline(Utc::now() + Duration::days(3))
            .assigned_to("Alice")
            .budget(1000.456)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let service = service().await;
        let a = service.create(alpha()).await.unwrap();
        let b = service.create(alpha()).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(a.name, "Alpha");
        assert_eq!(a.budget, 1000.46);
        assert_eq!(a.status, ProjectStatus::Active);
    }

    #[tokio::test]
    async fn test_create_reports_every_violation() {
        let service = service().await;
        let input = ProjectInput::new()
            .deadline(Utc::now() - Duration::days(1))
            .assigned_to("Bob")
            .budget(-5.0);

        let err = service.create(input).await.unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.get("name"), Some(NAME_REQUIRED));
        assert_eq!(errors.get("deadline"), Some(DEADLINE_NOT_FUTURE));
        assert_eq!(errors.get("budget"), Some(BUDGET_NEGATIVE));
        assert_eq!(errors.len(), 3);
    }

    #[tokio::test]
    async fn test_update_touches_only_supplied_fields() {
        let service = service().await;
        let created = service.create(alpha()).await.unwrap();

        let updated = service
            .update(&created.id.to_string(), ProjectInput::new().budget(2500.0))
            .await
            .unwrap();

        assert_eq!(updated.budget, 2500.0);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.deadline, created.deadline);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_repeated_updates_strictly_increase_updated_at() {
        let service = service().await;
        let created = service.create(alpha()).await.unwrap();
        let id = created.id.to_string();

        let mut last = created.updated_at;
        for _ in 0..5 {
            let updated = service.update(&id, ProjectInput::new()).await.unwrap();
            assert!(updated.updated_at > last);
            last = updated.updated_at;
        }
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_record_unchanged() {
        let service = service().await;
        let created = service.create(alpha()).await.unwrap();
        let id = created.id.to_string();

        let err = service
            .update(&id, ProjectInput::new().name("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));
        assert_eq!(service.get(&id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let service = service().await;
        for id in ["not-a-uuid", &Uuid::new_v4().to_string()] {
            assert!(matches!(service.get(id).await, Err(DeskError::NotFound(_))));
            assert!(matches!(service.delete(id).await, Err(DeskError::NotFound(_))));
            assert!(matches!(
                service.update(id, ProjectInput::new()).await,
                Err(DeskError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let service = service().await;
        let id = service.create(alpha()).await.unwrap().id.to_string();

        service.delete(&id).await.unwrap();
        assert!(matches!(service.get(&id).await, Err(DeskError::NotFound(_))));
        assert!(matches!(service.delete(&id).await, Err(DeskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_complete() {
        let service = service().await;
        let created = service.create(alpha()).await.unwrap();
        let done = service.mark_complete(&created.id.to_string()).await.unwrap();

        assert_eq!(done.status, ProjectStatus::Completed);
        assert!(done.updated_at > created.updated_at);
    }
}
