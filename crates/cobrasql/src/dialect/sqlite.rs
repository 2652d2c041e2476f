//! SQLite dialect.

use super::Dialect;
use crate::core::{ColumnDef, SqlType};
use crate::error::{CobraError, Result};

/// SQLite dialect implementation.
///
/// SQLite accepts any declared type name and derives a storage affinity from
/// it, so the registry names are written as-is. An auto-increment key must be
/// declared exactly `INTEGER PRIMARY KEY AUTOINCREMENT`.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn base_type(&self, sql_type: SqlType) -> &'static str {
        sql_type.name()
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    /// `INTEGER UNSIGNED` would stop the key from aliasing the rowid, which
    /// AUTOINCREMENT requires.
    fn emits_unsigned(&self, column: &ColumnDef) -> bool {
        column.is_unsigned() && !column.is_autoincrement()
    }

    fn modify_column(&self, _table: &str, _column: &ColumnDef) -> Result<String> {
        Err(CobraError::Unsupported {
            operation: "MODIFY COLUMN",
            dialect: "sqlite",
        })
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("ALTER TABLE {} RENAME TO {}", from, to)
    }
}
