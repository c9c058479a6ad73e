//! Query Builder
//!
//! Translates listing parameters into a filter predicate, a deterministic
//! sort and a pagination window.
//!
//! - `params.rs` - raw request parameters
//! - `filter.rs` - the filter predicate tree
//! - `sort.rs` - sort keys and the document comparator
//! - `page.rs` - pagination window and metadata
//! - `builder.rs` - parameter parsing and precedence rules

mod builder;
mod filter;
mod page;
mod params;
mod sort;

pub use builder::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ProjectQuery, QueryBuilder, UPCOMING_WINDOW_DAYS,
    active_filter, overdue_filter, upcoming_filter,
};
pub use filter::{CompareOp, Filter};
pub use page::{PageRequest, Pagination};
pub use params::ListParams;
pub use sort::{SortKey, SortSpec};
