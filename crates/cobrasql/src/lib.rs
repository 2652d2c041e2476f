//! # cobrasql
//!
//! Typed table/row convenience layer over SQLite and MySQL.
//!
//! This library provides:
//!
//! - **Type registry** of SQL types with precision/scale/sign rules
//! - **Column definitions** validated against the registry at construction
//! - **Tables** created from definitions or introspected from a live database
//! - **Rows** decoded into typed [`Value`]s and written back by primary key
//! - **A serialized statement queue** per engine, with typed completions
//!
//! ## Example
//!
//! ```rust,no_run
//! use cobrasql::{ColumnDef, Engine, SqlType, Value};
//!
//! #[tokio::main]
//! async fn main() -> cobrasql::Result<()> {
//!     let engine = Engine::sqlite("app.db")?;
//!     let users = engine
//!         .create_table(
//!             "users",
//!             [
//!                 ColumnDef::builder("id", SqlType::Integer)
//!                     .primary()
//!                     .autoincrement()
//!                     .unsigned()
//!                     .build()?,
//!                 ColumnDef::builder("name", SqlType::VarChar)
//!                     .precision(50)
//!                     .not_null()
//!                     .build()?,
//!             ],
//!         )
//!         .await?;
//!
//!     users.insert([Value::from("Alice")])?.await?;
//!     users.fetch_by_key(1i64, |rows| println!("{:?}", rows))?;
//!     engine.shutdown().await
//! }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "mysql")))]
compile_error!("cobrasql needs at least one of the `sqlite` or `mysql` features");

pub mod config;
pub mod core;
pub mod dialect;
mod drivers;
pub mod engine;
pub mod error;
pub mod row;
pub mod table;

// Re-exports for convenient access
pub use crate::config::{Config, MysqlConfig};
pub use crate::core::{ColumnDef, ColumnFlags, ColumnSet, PrimaryKeyPolicy, SqlType, Value};
pub use crate::engine::{Completion, ConnectionState, Engine};
pub use crate::error::{CobraError, Result};
pub use crate::row::Row;
pub use crate::table::Table;
