//! Client-side project form contract.
//!
//! A [`ProjectForm`] holds exactly what a user typed. Submitting it coerces
//! the text into typed values, calls the record service and folds the result
//! into a [`FormOutcome`] a form can render: field messages next to inputs,
//! or one general message for everything else.

use crate::core::DeskError;
use crate::json::JsonToInputConverter;
use crate::model::{Project, ProjectStatus, TEAM_MEMBERS};
use crate::service::RecordService;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectForm {
    pub name: String,
    pub description: String,
    pub status: String,
    /// `YYYY-MM-DD` or any RFC 3339 date-time.
    pub deadline: String,
    pub assigned_to: String,
    pub budget: String,
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            status: ProjectStatus::Active.as_str().to_string(),
            deadline: String::new(),
            assigned_to: TEAM_MEMBERS[0].to_string(),
            budget: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Saved(Project),
    /// Field name (wire spelling) to message.
    FieldErrors(BTreeMap<String, String>),
    General(String),
}

impl FormOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

impl ProjectForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefills the form for editing. The deadline is shown as a date.
    pub fn from_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            description: project.description.clone().unwrap_or_default(),
            status: project.status.as_str().to_string(),
            deadline: project.deadline.format("%Y-%m-%d").to_string(),
            assigned_to: project.assigned_to.clone(),
            budget: format!("{:.2}", project.budget),
        }
    }

    pub async fn submit_create(&self, records: &RecordService) -> FormOutcome {
        let result = match JsonToInputConverter::convert(&self.to_json()) {
            Ok(input) => records.create(input).await,
            Err(err) => Err(err),
        };
        Self::outcome(result)
    }

    pub async fn submit_update(&self, records: &RecordService, id: &str) -> FormOutcome {
        let result = match JsonToInputConverter::convert(&self.to_json()) {
            Ok(input) => records.update(id, input).await,
            Err(err) => Err(err),
        };
        Self::outcome(result)
    }

    /// Blank required inputs become `null` so they read as "not provided".
    /// A blank description stays a string and clears the field.
    fn to_json(&self) -> JsonValue {
        let blank_as_null = |raw: &str| {
            if raw.trim().is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(raw.to_string())
            }
        };

        let mut object = JsonMap::new();
        object.insert("name".into(), blank_as_null(&self.name));
        object.insert("description".into(), JsonValue::String(self.description.clone()));
        object.insert("status".into(), blank_as_null(&self.status));
        object.insert("deadline".into(), blank_as_null(&self.deadline));
        object.insert("assignedTo".into(), blank_as_null(&self.assigned_to));
        object.insert("budget".into(), blank_as_null(&self.budget));
        JsonValue::Object(object)
    }

    fn outcome(result: crate::core::Result<Project>) -> FormOutcome {
        match result {
            Ok(project) => FormOutcome::Saved(project),
            Err(DeskError::Validation(errors)) => FormOutcome::FieldErrors(errors.into_fields()),
            Err(DeskError::NotFound(_)) => FormOutcome::General("Project not found".to_string()),
            Err(err) => {
                warn!(error = %err, "Form submission failed");
                FormOutcome::General("Something went wrong, please try again".to_string())
            }
        }
    }
}
