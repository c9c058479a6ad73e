pub mod error;
pub mod types;
pub mod value;

pub use error::{DeskError, Result, ValidationErrors};
pub use types::Field;
pub use value::Value;
