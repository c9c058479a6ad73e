use crate::core::{Field, Value};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    #[serde(alias = "on hold", alias = "on-hold")]
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(Self::Active),
            "on_hold" | "on hold" | "on-hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("{} is not a valid status", other)),
        }
    }
}

/// A stored project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub deadline: DateTime<Utc>,
    pub assigned_to: String,
    pub budget: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Read a field as a comparable value.
    pub fn field_value(&self, field: Field) -> Value {
        match field {
            Field::Id => Value::Uuid(self.id),
            Field::Name => Value::Text(self.name.clone()),
            Field::Description => self.description.clone().into(),
            Field::Status => Value::Text(self.status.as_str().to_string()),
            Field::Deadline => Value::Timestamp(self.deadline),
            Field::AssignedTo => Value::Text(self.assigned_to.clone()),
            Field::Budget => Value::Number(self.budget),
            Field::CreatedAt => Value::Timestamp(self.created_at),
            Field::UpdatedAt => Value::Timestamp(self.updated_at),
        }
    }

    /// Text of a searchable field, if the field is textual and present.
    pub fn text_of(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(&self.name),
            Field::Description => self.description.as_deref(),
            Field::AssignedTo => Some(&self.assigned_to),
            _ => None,
        }
    }

    /// Whole days until the deadline, rounded up. Negative once overdue.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.deadline - now).num_milliseconds() as f64;
        (millis / MILLIS_PER_DAY).ceil() as i64
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now && self.status != ProjectStatus::Completed
    }

    /// Timestamp for the next mutation: `now`, but always strictly after
    /// the current `updated_at`.
    pub fn next_update_stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        }
    }
}

/// Serialized form of a project including the derived `daysRemaining`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub days_remaining: i64,
}

impl ProjectView {
    pub fn at(project: Project, now: DateTime<Utc>) -> Self {
        let days_remaining = project.days_remaining(now);
        Self {
            project,
            days_remaining,
        }
    }

    pub fn many(projects: Vec<Project>, now: DateTime<Utc>) -> Vec<Self> {
        projects.into_iter().map(|p| Self::at(p, now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Alpha".to_string(),
            description: None,
            status: ProjectStatus::Active,
            deadline: now + Duration::days(3),
            assigned_to: "Alice".to_string(),
            budget: 1000.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_accepts_legacy_spelling() {
        assert_eq!("on hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        assert_eq!("on_hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        let err = "paused".parse::<ProjectStatus>().unwrap_err();
        assert_eq!(err, "paused is not a valid status");
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ProjectStatus::OnHold).unwrap();
        assert_eq!(json, "\"on_hold\"");
        let parsed: ProjectStatus = serde_json::from_str("\"on hold\"").unwrap();
        assert_eq!(parsed, ProjectStatus::OnHold);
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = Utc::now();
        let mut project = sample(now);
        project.deadline = now + Duration::hours(49);
        assert_eq!(project.days_remaining(now), 3);
        project.deadline = now - Duration::hours(30);
        assert_eq!(project.days_remaining(now), -1);
    }

    #[test]
    fn completed_projects_are_never_overdue() {
        let now = Utc::now();
        let mut project = sample(now);
        project.deadline = now - Duration::days(1);
        assert!(project.is_overdue(now));
        project.status = ProjectStatus::Completed;
        assert!(!project.is_overdue(now));
    }

    #[test]
    fn update_stamp_is_strictly_increasing() {
        let now = Utc::now();
        let project = sample(now);
        assert!(project.next_update_stamp(now) > project.updated_at);
        assert!(project.next_update_stamp(now - Duration::seconds(5)) > project.updated_at);
    }

    #[test]
    fn view_uses_camel_case_keys() {
        let now = Utc::now();
        let view = ProjectView::at(sample(now), now);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["assignedTo"], "Alice");
        assert_eq!(json["daysRemaining"], 3);
        assert!(json.get("description").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
