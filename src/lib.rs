// ============================================================================
// projectdesk library
// ============================================================================

pub mod config;
pub mod connection;
pub mod core;
pub mod form;
pub mod json;
pub mod model;
pub mod query;
pub mod seed;
pub mod service;
pub mod storage;
pub mod web;

pub use connection::{
    Connection,
    config::ConnectionConfig,
    pool::{ConnectionPool, PoolGuard, PoolStats},
};
pub use crate::core::{DeskError, Result, ValidationErrors};
pub use model::{Project, ProjectInput, ProjectStatus, ProjectView};
pub use query::{ListParams, QueryBuilder};
pub use service::{Listing, ListingService, RecordService};
pub use storage::{DocumentStore, DurabilityMode};

use std::sync::Arc;

// ============================================================================
// High-level Client API
// ============================================================================

/// Project store client
///
/// Owns the connection pool and the two services built on it. Clones share
/// the same pool.
///
/// ```
/// # use projectdesk::{Client, ListParams};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> projectdesk::Result<()> {
/// let client = Client::in_memory().await?;
/// let listing = client.listing().list(&ListParams::new()).await?;
/// assert_eq!(listing.counts.total, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pool: Arc<ConnectionPool>,
    records: Arc<RecordService>,
    listing: Arc<ListingService>,
}

impl Client {
    /// Memory-only store with default settings.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(ConnectionConfig::new()).await
    }

    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        Self::connect_with(config, QueryBuilder::new()).await
    }

    /// Connect using a connection string: `projectdesk://host[:port]/database`
    pub async fn connect_url(url: &str) -> Result<Self> {
        let config = ConnectionConfig::from_url(url).map_err(DeskError::MalformedRequest)?;
        Self::connect(config).await
    }

    pub async fn connect_with(config: ConnectionConfig, builder: QueryBuilder) -> Result<Self> {
        let pool = ConnectionPool::new(config).await?;
        Ok(Self::from_pool(Arc::new(pool), builder))
    }

    pub fn from_pool(pool: Arc<ConnectionPool>, builder: QueryBuilder) -> Self {
        Self {
            records: Arc::new(RecordService::new(Arc::clone(&pool))),
            listing: Arc::new(ListingService::with_builder(Arc::clone(&pool), builder)),
            pool,
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn records(&self) -> &Arc<RecordService> {
        &self.records
    }

    pub fn listing(&self) -> &Arc<ListingService> {
        &self.listing
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Snapshot the store and truncate its log. No-op when memory-only.
    pub async fn checkpoint(&self) -> Result<()> {
        self.pool
            .run(|conn| async move { conn.checkpoint().await })
            .await
    }
}
