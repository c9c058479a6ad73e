use super::{Connection, config::ConnectionConfig};
use crate::core::{DeskError, Result};
use crate::storage::DocumentStore;
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Connection pool
///
/// Bounded set of store sessions shared by every request handler. Created
/// once at startup and handed out behind an `Arc`.
pub struct ConnectionPool {
    config: ConnectionConfig,
    store: Arc<DocumentStore>,
    available: Arc<Mutex<VecDeque<PooledConnection>>>,
    total_connections: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

/// A connection from the pool
struct PooledConnection {
    connection: Connection,
    created_at: Instant,
    last_used: Instant,
}

impl PooledConnection {
    fn new(connection: Connection, created_at: Instant) -> Self {
        Self {
            connection,
            created_at,
            last_used: Instant::now(),
        }
    }

    fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        max_lifetime.is_some_and(|lifetime| self.created_at.elapsed() > lifetime)
    }

    fn is_idle_too_long(&self, idle_timeout: Option<Duration>) -> bool {
        idle_timeout.is_some_and(|timeout| self.last_used.elapsed() > timeout)
    }
}

impl ConnectionPool {
    /// Opens the store described by `config` (persistent under
    /// `data_dir/<database>` when a data directory is set) and builds a pool
    /// over it.
    pub async fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate().map_err(DeskError::MalformedRequest)?;
        let store = match config.store_dir() {
            Some(dir) => DocumentStore::open(dir, config.durability)?,
            None => DocumentStore::new(),
        };
        Self::with_store(config, Arc::new(store)).await
    }

    /// Builds a pool over an existing store.
    pub async fn with_store(config: ConnectionConfig, store: Arc<DocumentStore>) -> Result<Self> {
        config.validate().map_err(DeskError::MalformedRequest)?;

        let pool = Self {
            config,
            store,
            available: Arc::new(Mutex::new(VecDeque::new())),
            total_connections: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        };

        pool.ensure_min_connections()?;
        debug!(
            min = pool.config.min_connections,
            max = pool.config.max_connections,
            "Connection pool ready"
        );

        Ok(pool)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Get a connection from the pool, waiting at most `connect_timeout`.
    pub async fn get_connection(&self) -> Result<PoolGuard> {
        let start = Instant::now();

        loop {
            if let Some(pooled) = self.try_get_available()? {
                return Ok(self.guard(pooled.connection, pooled.created_at));
            }

            if let Some(connection) = self.try_create_connection()? {
                return Ok(self.guard(connection, Instant::now()));
            }

            if start.elapsed() > self.config.connect_timeout {
                return Err(DeskError::unavailable(
                    "connection pool timeout: no connections available",
                ));
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Runs one store operation on a pooled connection.
    ///
    /// When the operation fails with a retryable error the connection is
    /// discarded, stale sessions are evicted, and the operation runs once more
    /// on a fresh connection. A second failure is returned as is.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(Connection) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.get_connection().await?;
        let first = op(guard.connection().clone()).await;
        match first {
            Err(err) if err.is_retryable() => {
                warn!(
                    connection = guard.connection().id(),
                    error = %err,
                    "Store operation failed, retrying on a fresh connection"
                );
                guard.discard();
                self.evict_stale()?;

                let guard = self.get_connection().await?;
                let result = op(guard.connection().clone()).await;
                if let Err(err) = &result
                    && err.is_retryable()
                {
                    guard.discard();
                }
                result
            }
            result => result,
        }
    }

    fn guard(&self, connection: Connection, created_at: Instant) -> PoolGuard {
        PoolGuard {
            connection,
            created_at,
            discarded: false,
            pool: Arc::clone(&self.available),
            total_connections: Arc::clone(&self.total_connections),
        }
    }

    /// Pops a usable connection, dropping expired and idle ones on the way.
    fn try_get_available(&self) -> Result<Option<PooledConnection>> {
        let mut available = self.available.lock()?;

        let before = available.len();
        available.retain(|pooled| {
            !pooled.is_expired(self.config.max_lifetime)
                && !pooled.is_idle_too_long(self.config.idle_timeout)
        });
        let removed = before - available.len();
        if removed > 0 {
            self.total_connections.fetch_sub(removed, Ordering::SeqCst);
        }

        Ok(available.pop_front())
    }

    /// Drops pooled sessions the store no longer accepts.
    fn evict_stale(&self) -> Result<()> {
        let mut available = self.available.lock()?;
        let before = available.len();
        available.retain(|pooled| pooled.connection.is_active());
        let removed = before - available.len();
        if removed > 0 {
            self.total_connections.fetch_sub(removed, Ordering::SeqCst);
            debug!(removed, "Evicted stale connections");
        }
        Ok(())
    }

    /// Opens a connection if the pool is below its limit.
    fn try_create_connection(&self) -> Result<Option<Connection>> {
        let reserved = self
            .total_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |total| {
                (total < self.config.max_connections).then_some(total + 1)
            });
        if reserved.is_err() {
            return Ok(None);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match Connection::open(id, Arc::clone(&self.store), self.config.query_timeout) {
            Ok(connection) => {
                debug!(connection = id, "Opened store connection");
                Ok(Some(connection))
            }
            Err(err) => {
                self.total_connections.fetch_sub(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    fn ensure_min_connections(&self) -> Result<()> {
        while self.total_connections.load(Ordering::SeqCst) < self.config.min_connections {
            let Some(connection) = self.try_create_connection()? else {
                break;
            };
            self.available
                .lock()?
                .push_back(PooledConnection::new(connection, Instant::now()));
        }
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        let available = self.available.lock().map(|a| a.len()).unwrap_or(0);
        let total = self.total_connections.load(Ordering::SeqCst);

        PoolStats {
            total_connections: total,
            available_connections: available,
            active_connections: total.saturating_sub(available),
            max_connections: self.config.max_connections,
        }
    }
}

/// Connection pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    #[serde(rename = "total")]
    pub total_connections: usize,
    #[serde(rename = "available")]
    pub available_connections: usize,
    #[serde(rename = "active")]
    pub active_connections: usize,
    #[serde(rename = "max")]
    pub max_connections: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {}/{} active, {} available, max {}",
            self.active_connections,
            self.total_connections,
            self.available_connections,
            self.max_connections
        )
    }
}

/// RAII guard for pooled connections
///
/// Returns the connection to the pool when dropped, unless it was discarded
/// or its session is no longer usable.
pub struct PoolGuard {
    connection: Connection,
    created_at: Instant,
    discarded: bool,
    pool: Arc<Mutex<VecDeque<PooledConnection>>>,
    total_connections: Arc<AtomicUsize>,
}

impl PoolGuard {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Closes the connection instead of returning it to the pool.
    pub fn discard(mut self) {
        self.discarded = true;
    }
}

impl std::ops::Deref for PoolGuard {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        if self.discarded || !self.connection.is_active() {
            self.connection.close();
            self.total_connections.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        match self.pool.lock() {
            Ok(mut pool) => pool.push_back(PooledConnection::new(
                self.connection.clone(),
                self.created_at,
            )),
            Err(_) => {
                warn!("Connection pool lock poisoned, dropping connection");
                self.connection.close();
                self.total_connections.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool(config: ConnectionConfig) -> ConnectionPool {
        ConnectionPool::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = pool(ConnectionConfig::new().min_connections(2).max_connections(5)).await;
        let stats = pool.stats();

        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.available_connections, 2);
    }

    #[tokio::test]
    async fn test_connection_return_to_pool() {
        let pool = pool(ConnectionConfig::new().min_connections(1).max_connections(5)).await;

        {
            let conn = pool.get_connection().await.unwrap();
            assert!(conn.is_active());
            let stats = pool.stats();
            assert_eq!(stats.active_connections, 1);
            assert_eq!(stats.available_connections, 0);
        }

        assert_eq!(pool.stats().available_connections, 1);
    }

    #[tokio::test]
    async fn test_max_connections_limit() {
        let pool = pool(
            ConnectionConfig::new()
                .max_connections(2)
                .connect_timeout(Duration::from_millis(100)),
        )
        .await;

        let _conn1 = pool.get_connection().await.unwrap();
        let _conn2 = pool.get_connection().await.unwrap();

        let result = pool.get_connection().await;
        assert!(matches!(result, Err(DeskError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_discarded_connection_is_not_reused() {
        let pool = pool(ConnectionConfig::new().min_connections(1)).await;
        let conn = pool.get_connection().await.unwrap();
        let id = conn.id();
        conn.discard();

        let stats = pool.stats();
        assert_eq!(stats.total_connections, 0);
        assert_ne!(pool.get_connection().await.unwrap().id(), id);
    }

    #[tokio::test]
    async fn test_run_retries_once_after_reset() {
        let pool = pool(ConnectionConfig::new().min_connections(3)).await;
        pool.store().reset_sessions();

        let attempts = AtomicUsize::new(0);
        let count = pool
            .run(|conn| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { conn.read(|c| c.len()).await }
            })
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(pool.stats().total_connections, 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_second_failure() {
        let pool = pool(ConnectionConfig::new()).await;
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = pool
            .run(|_conn| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(DeskError::unavailable("boom")) }
            })
            .await;

        assert!(matches!(result, Err(DeskError::StoreUnavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let pool = pool(ConnectionConfig::new()).await;
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = pool
            .run(|_conn| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(DeskError::not_found("x")) }
            })
            .await;

        assert!(matches!(result, Err(DeskError::NotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_offline_store_fails_fast() {
        let pool = pool(ConnectionConfig::new().min_connections(0)).await;
        pool.store().set_online(false);
        let result = pool.get_connection().await;
        assert!(matches!(result, Err(DeskError::StoreUnavailable(_))));
    }
}
