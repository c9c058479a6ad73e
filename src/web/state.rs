use crate::Client;
use crate::connection::pool::ConnectionPool;
use crate::service::{ListingService, RecordService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ConnectionPool>,
    pub records: Arc<RecordService>,
    pub listing: Arc<ListingService>,
}

impl AppState {
    pub fn new(client: &Client) -> Self {
        Self {
            pool: Arc::clone(client.pool()),
            records: Arc::clone(client.records()),
            listing: Arc::clone(client.listing()),
        }
    }
}
