//! Listing and record services
//!
//! Both services own an `Arc` of the connection pool and run every store
//! operation through [`ConnectionPool::run`], so a dropped session is retried
//! once before the error reaches the caller.
//!
//! [`ConnectionPool::run`]: crate::connection::pool::ConnectionPool::run

mod listing;
mod record;

pub use listing::{Counts, Listing, ListingService};
pub use record::RecordService;
