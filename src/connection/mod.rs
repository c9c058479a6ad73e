pub mod config;
pub mod pool;

use crate::core::{DeskError, Result};
use crate::model::Project;
use crate::query::Filter;
use crate::storage::{Collection, DocumentStore};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Store connection handle
///
/// A session against the shared [`DocumentStore`]. Every operation first
/// checks that the session is still usable (not closed, store online, same
/// store generation) and is then bounded by the query timeout. Any of those
/// failures is a [`DeskError::StoreUnavailable`], which the pool treats as
/// retryable.
///
/// Clones share the same session state.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    store: Arc<DocumentStore>,
    generation: u64,
    query_timeout: Duration,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a session. Fails when the store is offline.
    pub(crate) fn open(id: u64, store: Arc<DocumentStore>, query_timeout: Duration) -> Result<Self> {
        if !store.is_online() {
            return Err(DeskError::unavailable("store is offline"));
        }
        let generation = store.generation();
        Ok(Self {
            id,
            store,
            generation,
            query_timeout,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the session can still be used: open, and opened under the
    /// store's current generation.
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation == self.store.generation()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeskError::unavailable("connection is closed"));
        }
        if !self.store.is_online() {
            return Err(DeskError::unavailable("store is offline"));
        }
        if self.generation != self.store.generation() {
            return Err(DeskError::unavailable("connection was reset by the store"));
        }
        Ok(())
    }

    async fn guarded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        self.check()?;
        match tokio::time::timeout(self.query_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(DeskError::unavailable(format!(
                "operation timed out after {}ms",
                self.query_timeout.as_millis()
            ))),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.check()
    }

    /// Runs `f` against a consistent view of the collection.
    pub async fn read<R>(&self, f: impl FnOnce(&Collection) -> R) -> Result<R> {
        self.guarded(async { Ok(self.store.read(f).await) }).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<Project>> {
        self.guarded(async { Ok(self.store.get(id).await) }).await
    }

    pub async fn count(&self, filter: &Filter) -> Result<usize> {
        self.read(|c| c.count(filter)).await
    }

    pub async fn insert_with(&self, build: impl FnOnce(Uuid) -> Project) -> Result<Project> {
        self.guarded(self.store.insert_with(build)).await
    }

    pub async fn update_with(
        &self,
        id: &Uuid,
        f: impl FnOnce(&Project) -> Result<Project>,
    ) -> Result<Project> {
        self.guarded(self.store.update_with(id, f)).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<Option<Project>> {
        self.guarded(self.store.delete(id)).await
    }

    pub async fn clear(&self) -> Result<usize> {
        self.guarded(self.store.clear()).await
    }

    pub async fn checkpoint(&self) -> Result<()> {
        self.guarded(self.store.checkpoint()).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
