//! JSON to project input conversion.

use crate::core::{DeskError, Field, Result};
use crate::model::validation::{
    ASSIGNEE_REQUIRED, BUDGET_NOT_NUMBER, BUDGET_REQUIRED, DEADLINE_REQUIRED, NAME_REQUIRED,
};
use crate::model::{ProjectInput, ProjectStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const DEADLINE_INVALID: &str = "Deadline must be a valid date";

/// Converts JSON request bodies into project inputs.
pub struct JsonToInputConverter;

impl JsonToInputConverter {
    /// Convert a JSON object into a [`ProjectInput`].
    ///
    /// Only a non-object body is an error. Unknown keys and server-assigned
    /// fields are ignored; values of the wrong type are recorded on the input
    /// as field errors.
    pub fn convert(document: &JsonValue) -> Result<ProjectInput> {
        let object = document
            .as_object()
            .ok_or_else(|| DeskError::malformed("Expected a JSON object"))?;

        let mut input = ProjectInput::new();

        if let Some(value) = lookup(object, &["name"]) {
            match value {
                JsonValue::Null => input.reject(Field::Name.as_str(), NAME_REQUIRED),
                other => match Self::text(other) {
                    Some(name) => input.name = Some(name),
                    None => input.reject(Field::Name.as_str(), "Name must be a string"),
                },
            }
        }

        if let Some(value) = lookup(object, &["description"]) {
            match value {
                JsonValue::Null => input.description = Some(String::new()),
                other => match Self::text(other) {
                    Some(description) => input.description = Some(description),
                    None => input.reject(
                        Field::Description.as_str(),
                        "Description must be a string",
                    ),
                },
            }
        }

        if let Some(value) = lookup(object, &["status"]) {
            match value {
                JsonValue::Null => {}
                JsonValue::String(raw) => match raw.parse::<ProjectStatus>() {
                    Ok(status) => input.status = Some(status),
                    Err(message) => input.reject(Field::Status.as_str(), message),
                },
                other => input.reject(
                    Field::Status.as_str(),
                    format!("{} is not a valid status", other),
                ),
            }
        }

        if let Some(value) = lookup(object, &["deadline"]) {
            match Self::timestamp(value) {
                Ok(Some(deadline)) => input.deadline = Some(deadline),
                Ok(None) => input.reject(Field::Deadline.as_str(), DEADLINE_REQUIRED),
                Err(()) => input.reject(Field::Deadline.as_str(), DEADLINE_INVALID),
            }
        }

        if let Some(value) = lookup(object, &["assignedTo", "assigned_to"]) {
            match value {
                JsonValue::Null => input.reject(Field::AssignedTo.as_str(), ASSIGNEE_REQUIRED),
                other => match Self::text(other) {
                    Some(assignee) => input.assigned_to = Some(assignee),
                    None => input.reject(Field::AssignedTo.as_str(), "Assignee must be a string"),
                },
            }
        }

        if let Some(value) = lookup(object, &["budget"]) {
            match Self::number(value) {
                Ok(Some(budget)) => input.budget = Some(budget),
                Ok(None) => input.reject(Field::Budget.as_str(), BUDGET_REQUIRED),
                Err(()) => input.reject(Field::Budget.as_str(), BUDGET_NOT_NUMBER),
            }
        }

        Ok(input)
    }

    /// Strings pass through; numbers and booleans are stringified.
    fn text(value: &JsonValue) -> Option<String> {
        match value {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// `Ok(None)` for null or blank input.
    fn timestamp(value: &JsonValue) -> std::result::Result<Option<DateTime<Utc>>, ()> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(s) if s.trim().is_empty() => Ok(None),
            JsonValue::String(s) => parse_timestamp(s).map(Some).ok_or(()),
            JsonValue::Number(n) => n
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .map(Some)
                .ok_or(()),
            _ => Err(()),
        }
    }

    /// `Ok(None)` for null or blank input; numeric strings are coerced.
    fn number(value: &JsonValue) -> std::result::Result<Option<f64>, ()> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Number(n) => n.as_f64().map(Some).ok_or(()),
            JsonValue::String(s) if s.trim().is_empty() => Ok(None),
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or(()),
            _ => Err(()),
        }
    }
}

fn lookup<'a>(object: &'a JsonMap<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter().find_map(|key| object.get(*key))
}

/// Parse an RFC 3339 date-time, a naive `YYYY-MM-DDTHH:MM[:SS]` (taken as
/// UTC) or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
