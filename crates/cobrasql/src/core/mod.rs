//! Schema building blocks shared by every engine.
//!
//! - [`types`]: the static Type Registry
//! - [`column`]: immutable column definitions validated against the registry
//! - [`column_set`]: the per-table set of column definitions
//! - [`value`]: decoded column values
//! - [`identifier`]: validation of names spliced into SQL text

pub mod column;
pub mod column_set;
pub mod identifier;
pub mod types;
pub mod value;

pub use column::{ColumnDef, ColumnDefBuilder, ColumnFlags};
pub use column_set::{ColumnSet, PrimaryKeyPolicy};
pub use identifier::validate_identifier;
pub use types::{by_type_code, descriptors, lookup, HostType, SqlType, TypeDescriptor};
pub use value::Value;
