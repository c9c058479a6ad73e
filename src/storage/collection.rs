use super::index::{TrigramIndex, ValueIndex};
use crate::core::{Field, Value};
use crate::model::Project;
use crate::query::{Filter, SortSpec};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// The project collection with its secondary indexes.
///
/// Documents are keyed by id. The status and assignee indexes serve exact
/// matches; the trigram index serves `search` over name and description.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    documents: BTreeMap<Uuid, Project>,
    by_status: ValueIndex,
    by_assignee: ValueIndex,
    text: TrigramIndex,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: impl IntoIterator<Item = Project>) -> Self {
        let mut collection = Self::new();
        for project in documents {
            collection.upsert(project);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.documents.contains_key(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Project> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Project> {
        self.documents.values()
    }

    /// Insert or replace a document, keeping the indexes in step.
    /// Returns the previous version.
    pub fn upsert(&mut self, project: Project) -> Option<Project> {
        let previous = self.remove(&project.id);
        self.index(&project);
        self.documents.insert(project.id, project);
        previous
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Project> {
        let project = self.documents.remove(id)?;
        self.by_status.remove(project.status.as_str(), project.id);
        self.by_assignee.remove(&project.assigned_to, project.id);
        self.text.remove(project.id);
        Some(project)
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.documents.len();
        self.documents.clear();
        self.by_status.clear();
        self.by_assignee.clear();
        self.text.clear();
        removed
    }

    /// Matching documents, sorted, then windowed by `skip`/`limit`.
    pub fn find(&self, filter: &Filter, sort: &SortSpec, skip: usize, limit: usize) -> Vec<Project> {
        let mut matches: Vec<Project> = self
            .candidates(filter)
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort.sort(&mut matches);
        matches.into_iter().skip(skip).take(limit).collect()
    }

    /// All matching documents in sort order.
    pub fn find_all(&self, filter: &Filter, sort: &SortSpec) -> Vec<Project> {
        self.find(filter, sort, 0, usize::MAX)
    }

    pub fn count(&self, filter: &Filter) -> usize {
        if let Filter::All = filter {
            return self.len();
        }
        self.candidates(filter).filter(|p| filter.matches(p)).count()
    }

    fn index(&mut self, project: &Project) {
        self.by_status.add(project.status.as_str(), project.id);
        self.by_assignee.add(&project.assigned_to, project.id);
        let texts = std::iter::once(project.name.as_str()).chain(project.description.as_deref());
        self.text.add(project.id, texts);
    }

    /// Narrow the scan using whichever indexes the filter can use.
    fn candidates<'a>(&'a self, filter: &Filter) -> Box<dyn Iterator<Item = &'a Project> + 'a> {
        let mut narrowed: Option<BTreeSet<Uuid>> = None;

        let mut intersect = |ids: BTreeSet<Uuid>| {
            narrowed = Some(match narrowed.take() {
                Some(current) => current.intersection(&ids).copied().collect(),
                None => ids,
            });
        };

        if let Some(Value::Text(status)) = filter.required_eq(Field::Status) {
            intersect(self.by_status.lookup(status));
        }
        if let Some(Value::Text(assignee)) = filter.required_eq(Field::AssignedTo) {
            intersect(self.by_assignee.lookup(assignee));
        }
        if let Some((fields, needle)) = filter.required_search() {
            let indexed = fields
                .iter()
                .all(|f| matches!(f, Field::Name | Field::Description));
            if indexed && let Some(ids) = self.text.candidates(needle) {
                intersect(ids);
            }
        }

        match narrowed {
            Some(ids) => Box::new(ids.into_iter().filter_map(move |id| self.documents.get(&id))),
            None => Box::new(self.documents.values()),
        }
    }
}
