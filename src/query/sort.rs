// ============================================================================
// src/query/sort.rs - Deterministic document ordering
// ============================================================================
//
// - Multi-key sorting with per-key direction
// - Stable sort (maintains relative order for equal elements)
// - Every sort ends with an implicit `id ASC` key, so the order is total and
//   pagination windows never overlap or skip documents
//
// ============================================================================

use crate::core::Field;
use crate::model::Project;
use std::cmp::Ordering;

/// A single sorting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: Field,
    /// Sort direction: false=ASC, true=DESC
    pub descending: bool,
}

impl SortKey {
    pub fn new(field: Field, descending: bool) -> Self {
        Self { field, descending }
    }

    pub fn asc(field: Field) -> Self {
        Self::new(field, false)
    }

    pub fn desc(field: Field) -> Self {
        Self::new(field, true)
    }

    fn compare(&self, a: &Project, b: &Project) -> Ordering {
        let ordering = a.field_value(self.field).compare(&b.field_value(self.field));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    /// Most recently created first.
    pub fn newest_first() -> Self {
        Self::new(vec![SortKey::desc(Field::CreatedAt)])
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compare two documents by each key in order, then by id.
    pub fn compare(&self, a: &Project, b: &Project) -> Ordering {
        for key in &self.keys {
            let ordering = key.compare(a, b);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    }

    pub fn sort(&self, projects: &mut [Project]) {
        projects.sort_by(|a, b| self.compare(a, b));
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::newest_first()
    }
}
