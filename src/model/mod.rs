//! Project domain model
//!
//! - `project.rs` - the stored document and its status enum
//! - `input.rs` - create/update payloads
//! - `validation.rs` - explicit field validation run before persistence

mod input;
mod project;
pub mod validation;

pub use input::ProjectInput;
pub use project::{Project, ProjectStatus, ProjectView};

/// Team members projects may be assigned to. Informal list, not enforced.
pub const TEAM_MEMBERS: [&str; 6] = ["Alice", "Bob", "Charlie", "Diana", "Eve", "Frank"];
