//! JSON payload conversion
//!
//! Turns loosely-typed JSON request bodies into [`ProjectInput`]s, recording
//! a field-level error for every value that cannot be coerced instead of
//! failing the whole document.
//!
//! [`ProjectInput`]: crate::model::ProjectInput

mod converter;

pub use converter::{JsonToInputConverter, parse_timestamp};
