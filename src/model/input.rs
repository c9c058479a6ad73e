use super::ProjectStatus;
use crate::core::ValidationErrors;
use chrono::{DateTime, Utc};

/// Client-supplied project fields for create and update.
///
/// Every field is optional: `create` requires the mandatory ones, `update`
/// replaces only what is present. Server-assigned fields have no slot here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInput {
    pub name: Option<String>,
    /// `Some("")` clears the description on update.
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub budget: Option<f64>,
    pub(crate) rejected: ValidationErrors,
}

impl ProjectInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Record a field whose raw value could not be converted.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.rejected.add(field, message);
    }

    /// Conversion failures recorded while building this input.
    pub fn rejected(&self) -> &ValidationErrors {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.deadline.is_none()
            && self.assigned_to.is_none()
            && self.budget.is_none()
            && self.rejected.is_empty()
    }
}
