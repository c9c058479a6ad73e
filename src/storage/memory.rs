use super::collection::Collection;
use super::persistence::{DurabilityMode, PersistenceManager, WalEntry};
use crate::core::{DeskError, Result};
use crate::model::Project;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Collection plus its journal, guarded together so a mutation and its
/// log record are applied atomically.
struct StoreState {
    collection: Collection,
    persistence: Option<PersistenceManager>,
}

impl StoreState {
    fn journal(&mut self, entry: WalEntry) -> Result<()> {
        match self.persistence.as_mut() {
            Some(persistence) => persistence.log(&entry),
            None => Ok(()),
        }
    }

    fn maybe_checkpoint(&mut self) {
        let Some(persistence) = self.persistence.as_mut() else {
            return;
        };
        if !persistence.needs_checkpoint() {
            return;
        }
        let projects = self.collection.documents().cloned().collect();
        // the mutation is already in the log, so a failed checkpoint only
        // delays truncation
        if let Err(e) = persistence.checkpoint(projects) {
            warn!(error = %e, "Checkpoint failed");
        }
    }
}

/// The entity store: one collection of project documents.
///
/// Reads share the lock; each write holds it exclusively for a single
/// document, so every write is atomic and last-write-wins.
///
/// The store also carries an availability flag and a session generation.
/// Connections opened under an older generation are rejected, which is how
/// a store restart looks to the connection layer.
pub struct DocumentStore {
    state: RwLock<StoreState>,
    persistent: bool,
    online: AtomicBool,
    generation: AtomicU64,
}

impl DocumentStore {
    /// Memory-only store.
    pub fn new() -> Self {
        Self::with_state(Collection::new(), None)
    }

    /// Store backed by `data_dir`, recovered from its snapshot and log.
    pub fn open(data_dir: impl AsRef<Path>, mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let persistence = PersistenceManager::open(data_dir, mode)?;
        let collection = Collection::from_documents(persistence.recover()?);
        info!(
            data_dir = %data_dir.display(),
            projects = collection.len(),
            "Opened persistent store"
        );
        Ok(Self::with_state(collection, Some(persistence)))
    }

    fn with_state(collection: Collection, persistence: Option<PersistenceManager>) -> Self {
        Self {
            persistent: persistence.is_some(),
            state: RwLock::new(StoreState {
                collection,
                persistence,
            }),
            online: AtomicBool::new(true),
            generation: AtomicU64::new(1),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        info!(online, "Store availability changed");
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidates every open session.
    pub fn reset_sessions(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "Store sessions reset");
        generation
    }

    /// Runs `f` against a consistent view of the collection.
    pub async fn read<R>(&self, f: impl FnOnce(&Collection) -> R) -> R {
        let state = self.state.read().await;
        f(&state.collection)
    }

    pub async fn get(&self, id: &Uuid) -> Option<Project> {
        self.read(|c| c.get(id).cloned()).await
    }

    pub async fn len(&self) -> usize {
        self.read(Collection::len).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Inserts the document built for a fresh, never-used id.
    pub async fn insert_with(&self, build: impl FnOnce(Uuid) -> Project) -> Result<Project> {
        let mut state = self.state.write().await;
        let mut id = Uuid::new_v4();
        while state.collection.contains(&id) {
            id = Uuid::new_v4();
        }

        let project = build(id);
        if project.id != id {
            return Err(DeskError::Serialization(
                "document id does not match the assigned id".to_string(),
            ));
        }
        state.journal(WalEntry::Insert(project.clone()))?;
        state.collection.upsert(project.clone());
        state.maybe_checkpoint();
        Ok(project)
    }

    /// Replaces the document with `f(current)`. The id is kept.
    pub async fn update_with(
        &self,
        id: &Uuid,
        f: impl FnOnce(&Project) -> Result<Project>,
    ) -> Result<Project> {
        let mut state = self.state.write().await;
        let current = state
            .collection
            .get(id)
            .ok_or_else(|| DeskError::not_found(id))?;

        let mut updated = f(current)?;
        updated.id = *id;
        state.journal(WalEntry::Replace(updated.clone()))?;
        state.collection.upsert(updated.clone());
        state.maybe_checkpoint();
        Ok(updated)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<Option<Project>> {
        let mut state = self.state.write().await;
        if !state.collection.contains(id) {
            return Ok(None);
        }
        state.journal(WalEntry::Delete(*id))?;
        let removed = state.collection.remove(id);
        state.maybe_checkpoint();
        Ok(removed)
    }

    /// Removes every document. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut state = self.state.write().await;
        state.journal(WalEntry::Clear)?;
        let removed = state.collection.clear();
        state.maybe_checkpoint();
        Ok(removed)
    }

    /// Writes a snapshot and truncates the log. No-op for a memory-only store.
    pub async fn checkpoint(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let projects = state.collection.documents().cloned().collect();
        match state.persistence.as_mut() {
            Some(persistence) => persistence.checkpoint(projects),
            None => Ok(()),
        }
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
