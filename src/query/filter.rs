use crate::core::{Field, Value};
use crate::model::Project;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::LtEq => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::GtEq => ordering != Ordering::Less,
        }
    }
}

/// Filter predicate over project documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Compare {
        field: Field,
        op: CompareOp,
        value: Value,
    },
    /// Case-insensitive substring match against any of `fields`.
    /// `needle` is stored lowercased.
    Search { fields: Vec<Field>, needle: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn compare(field: Field, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    /// Half-open range `[lower, upper)`.
    pub fn range(field: Field, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self::And(vec![
            Self::compare(field, CompareOp::GtEq, lower),
            Self::compare(field, CompareOp::Lt, upper),
        ])
    }

    pub fn search(fields: Vec<Field>, needle: &str) -> Self {
        Self::Search {
            fields,
            needle: needle.to_lowercase(),
        }
    }

    /// Conjunction that collapses to `All` or a single condition when it can.
    pub fn all_of(mut conditions: Vec<Filter>) -> Self {
        conditions.retain(|c| !matches!(c, Filter::All));
        match conditions.len() {
            0 => Self::All,
            1 => conditions.remove(0),
            _ => Self::And(conditions),
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        match self {
            Self::All => true,
            Self::Compare { field, op, value } => {
                let actual = project.field_value(*field);
                if actual.is_null() || value.is_null() {
                    // NULL only equals NULL
                    return match op {
                        CompareOp::Eq => actual.is_null() && value.is_null(),
                        CompareOp::NotEq => actual.is_null() != value.is_null(),
                        _ => false,
                    };
                }
                op.holds(actual.compare(value))
            }
            Self::Search { fields, needle } => fields.iter().any(|field| {
                project
                    .text_of(*field)
                    .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
            }),
            Self::And(filters) => filters.iter().all(|f| f.matches(project)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(project)),
        }
    }

    /// Equality constraint on `field` that every match must satisfy, if any.
    pub fn required_eq(&self, field: Field) -> Option<&Value> {
        match self {
            Self::Compare {
                field: f,
                op: CompareOp::Eq,
                value,
            } if *f == field => Some(value),
            Self::And(filters) => filters.iter().find_map(|f| f.required_eq(field)),
            _ => None,
        }
    }

    /// Search needle every match must contain, if any.
    pub fn required_search(&self) -> Option<(&[Field], &str)> {
        match self {
            Self::Search { fields, needle } => Some((fields.as_slice(), needle.as_str())),
            Self::And(filters) => filters.iter().find_map(|f| f.required_search()),
            _ => None,
        }
    }
}
