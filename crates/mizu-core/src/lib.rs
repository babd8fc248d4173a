//! Mizu Core - Result logs, type-indexed lookup, store values and error handling

pub mod error;
pub mod lookup;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use lookup::find_one_by_type;
pub use types::*;
pub use value::*;
