//! Entity store: the project collection, its indexes and its journal.

mod collection;
mod index;
pub mod memory;
pub mod persistence;

pub use collection::Collection;
pub use index::{TrigramIndex, ValueIndex};
pub use memory::DocumentStore;
pub use persistence::DurabilityMode;
