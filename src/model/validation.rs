//! Explicit field validation for project writes.
//!
//! Services call [`validate_new`] or [`validate_changes`] before touching the
//! store. Every violated field is reported, not just the first one.

use super::{Project, ProjectInput, ProjectStatus};
use crate::core::{Field, Result, ValidationErrors};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

pub const NAME_REQUIRED: &str = "Please provide a project name";
pub const NAME_TOO_LONG: &str = "Name cannot be more than 100 characters";
pub const DESCRIPTION_TOO_LONG: &str = "Description cannot be more than 500 characters";
pub const DEADLINE_REQUIRED: &str = "Please provide a deadline";
pub const DEADLINE_NOT_FUTURE: &str = "Deadline must be in the future";
pub const ASSIGNEE_REQUIRED: &str = "Please assign the project to someone";
pub const BUDGET_REQUIRED: &str = "Please provide a budget";
pub const BUDGET_NEGATIVE: &str = "Budget cannot be negative";
pub const BUDGET_NOT_NUMBER: &str = "Budget must be a number";

/// A fully validated, normalized create request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub deadline: DateTime<Utc>,
    pub assigned_to: String,
    pub budget: f64,
}

impl NewProject {
    /// Materialize the document; `created_at` and `updated_at` are both `now`.
    pub fn into_project(self, id: Uuid, now: DateTime<Utc>) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            status: self.status,
            deadline: self.deadline,
            assigned_to: self.assigned_to,
            budget: self.budget,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A validated, normalized partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub budget: Option<f64>,
}

impl ProjectChanges {
    pub fn status_only(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Apply the supplied fields on top of `current`; everything else is kept.
    pub fn apply(&self, current: &Project, stamp: DateTime<Utc>) -> Project {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(deadline) = self.deadline {
            next.deadline = deadline;
        }
        if let Some(assignee) = &self.assigned_to {
            next.assigned_to = assignee.clone();
        }
        if let Some(budget) = self.budget {
            next.budget = budget;
        }
        next.updated_at = stamp;
        next
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Validate a create request: required fields must be present.
pub fn validate_new(input: ProjectInput, now: DateTime<Utc>) -> Result<NewProject> {
    let mut errors = input.rejected.clone();

    let name = match input.name {
        Some(raw) => check_name(&mut errors, &raw),
        None => {
            errors.add(Field::Name.as_str(), NAME_REQUIRED);
            None
        }
    };
    let description = input
        .description
        .and_then(|raw| check_description(&mut errors, &raw));
    let deadline = match input.deadline {
        Some(deadline) => check_deadline(&mut errors, deadline, now),
        None => {
            errors.add(Field::Deadline.as_str(), DEADLINE_REQUIRED);
            None
        }
    };
    let assigned_to = match input.assigned_to {
        Some(raw) => check_assignee(&mut errors, &raw),
        None => {
            errors.add(Field::AssignedTo.as_str(), ASSIGNEE_REQUIRED);
            None
        }
    };
    let budget = match input.budget {
        Some(raw) => check_budget(&mut errors, raw),
        None => {
            errors.add(Field::Budget.as_str(), BUDGET_REQUIRED);
            None
        }
    };

    match (name, deadline, assigned_to, budget) {
        (Some(name), Some(deadline), Some(assigned_to), Some(budget)) if errors.is_empty() => {
            Ok(NewProject {
                name,
                description,
                status: input.status.unwrap_or_default(),
                deadline,
                assigned_to,
                budget,
            })
        }
        _ => Err(errors.into()),
    }
}

/// Validate an update: only the supplied fields are checked.
pub fn validate_changes(input: ProjectInput, now: DateTime<Utc>) -> Result<ProjectChanges> {
    let mut errors = input.rejected.clone();

    let changes = ProjectChanges {
        name: input.name.and_then(|raw| check_name(&mut errors, &raw)),
        description: input.description.map(|raw| check_description(&mut errors, &raw)),
        status: input.status,
        deadline: input
            .deadline
            .and_then(|deadline| check_deadline(&mut errors, deadline, now)),
        assigned_to: input
            .assigned_to
            .and_then(|raw| check_assignee(&mut errors, &raw)),
        budget: input.budget.and_then(|raw| check_budget(&mut errors, raw)),
    };

    errors.into_result()?;
    Ok(changes)
}

/// Round to cents, folding `-0.0` into `0.0`.
pub fn normalize_budget(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn check_name(errors: &mut ValidationErrors, raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        errors.add(Field::Name.as_str(), NAME_REQUIRED);
        return None;
    }
    if name.chars().count() > NAME_MAX_LEN {
        errors.add(Field::Name.as_str(), NAME_TOO_LONG);
        return None;
    }
    Some(name.to_string())
}

fn check_description(errors: &mut ValidationErrors, raw: &str) -> Option<String> {
    let description = raw.trim();
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        errors.add(Field::Description.as_str(), DESCRIPTION_TOO_LONG);
        return None;
    }
    if description.is_empty() {
        None
    } else {
        Some(description.to_string())
    }
}

fn check_deadline(
    errors: &mut ValidationErrors,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if deadline <= now {
        errors.add(Field::Deadline.as_str(), DEADLINE_NOT_FUTURE);
        return None;
    }
    Some(deadline)
}

fn check_assignee(errors: &mut ValidationErrors, raw: &str) -> Option<String> {
    let assignee = raw.trim();
    if assignee.is_empty() {
        errors.add(Field::AssignedTo.as_str(), ASSIGNEE_REQUIRED);
        return None;
    }
    Some(assignee.to_string())
}

fn check_budget(errors: &mut ValidationErrors, raw: f64) -> Option<f64> {
    if !raw.is_finite() {
        errors.add(Field::Budget.as_str(), BUDGET_NOT_NUMBER);
        return None;
    }
    // scaling to cents overflows for values near f64::MAX
    let budget = normalize_budget(raw);
    if !budget.is_finite() {
        errors.add(Field::Budget.as_str(), BUDGET_NOT_NUMBER);
        return None;
    }
    if budget < 0.0 {
        errors.add(Field::Budget.as_str(), BUDGET_NEGATIVE);
        return None;
    }
    Some(budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeskError;
    use chrono::Duration;

    fn valid_input(now: DateTime<Utc>) -> ProjectInput {
        ProjectInput::new()
            .name("  Alpha  ")
            .deadline(now + Duration::days(3))
            .assigned_to("Alice")
            .budget(1000.0)
    }

    fn errors_of(result: Result<impl std::fmt::Debug>) -> ValidationErrors {
        match result {
            Err(DeskError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn new_project_is_trimmed_and_defaults_to_active() {
        let now = Utc::now();
        let project = validate_new(valid_input(now), now).unwrap();
        assert_eq!(project.name, "Alpha");
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.description, None);
    }

    #[test]
    fn every_violated_field_is_reported() {
        let now = Utc::now();
        let input = ProjectInput::new()
            .name("x".repeat(101))
            .description("d".repeat(501))
            .deadline(now - Duration::days(1))
            .budget(-5.0);

        let errors = errors_of(validate_new(input, now));
        assert_eq!(errors.get("name"), Some(NAME_TOO_LONG));
        assert_eq!(errors.get("description"), Some(DESCRIPTION_TOO_LONG));
        assert_eq!(errors.get("deadline"), Some(DEADLINE_NOT_FUTURE));
        assert_eq!(errors.get("assignedTo"), Some(ASSIGNEE_REQUIRED));
        assert_eq!(errors.get("budget"), Some(BUDGET_NEGATIVE));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn missing_required_fields_use_provide_messages() {
        let now = Utc::now();
        let errors = errors_of(validate_new(ProjectInput::new(), now));
        assert_eq!(errors.get("name"), Some(NAME_REQUIRED));
        assert_eq!(errors.get("deadline"), Some(DEADLINE_REQUIRED));
        assert_eq!(errors.get("budget"), Some(BUDGET_REQUIRED));
    }

    #[test]
    fn budget_is_rounded_to_cents() {
        let now = Utc::now();
        let project = validate_new(valid_input(now).budget(12.345_6), now).unwrap();
        assert_eq!(project.budget, 12.35);
        assert_eq!(normalize_budget(-0.001), 0.0);
        assert!(normalize_budget(-0.001).is_sign_positive());
    }

    #[test]
    fn budget_too_large_to_round_is_rejected() {
        let now = Utc::now();
        let errors = errors_of(validate_new(valid_input(now).budget(1e307), now));
        assert_eq!(errors.get("budget"), Some(BUDGET_NOT_NUMBER));

        let errors = errors_of(validate_changes(ProjectInput::new().budget(-1e307), now));
        assert_eq!(errors.get("budget"), Some(BUDGET_NOT_NUMBER));

        let project = validate_new(valid_input(now).budget(1e15), now).unwrap();
        assert_eq!(project.budget, 1e15);
    }

    #[test]
    fn conversion_errors_take_precedence() {
        let now = Utc::now();
        let mut input = valid_input(now);
        input.budget = None;
        input.reject("budget", BUDGET_NOT_NUMBER);

        let errors = errors_of(validate_new(input, now));
        assert_eq!(errors.get("budget"), Some(BUDGET_NOT_NUMBER));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn changes_only_check_supplied_fields() {
        let now = Utc::now();
        let changes = validate_changes(ProjectInput::new().budget(250.0), now).unwrap();
        assert_eq!(changes.budget, Some(250.0));
        assert!(changes.name.is_none());

        let errors = errors_of(validate_changes(ProjectInput::new().name("   "), now));
        assert_eq!(errors.get("name"), Some(NAME_REQUIRED));
    }

    #[test]
    fn empty_description_clears_on_update() {
        let now = Utc::now();
        let changes = validate_changes(ProjectInput::new().description("  "), now).unwrap();
        assert_eq!(changes.description, Some(None));
    }

    #[test]
    fn apply_keeps_untouched_fields() {
        let now = Utc::now();
        let project = validate_new(valid_input(now).description("first"), now)
            .unwrap()
            .into_project(Uuid::new_v4(), now);
        let stamp = project.next_update_stamp(now);

        let updated = ProjectChanges::status_only(ProjectStatus::OnHold).apply(&project, stamp);
        assert_eq!(updated.status, ProjectStatus::OnHold);
        assert_eq!(updated.name, project.name);
        assert_eq!(updated.description.as_deref(), Some("first"));
        assert_eq!(updated.created_at, project.created_at);
        assert!(updated.updated_at > project.updated_at);
    }
}
