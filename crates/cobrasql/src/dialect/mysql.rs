//! MySQL/MariaDB dialect.

use super::Dialect;
use crate::core::{ColumnDef, SqlType};
use crate::error::Result;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn base_type(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Integer => "INT",
            SqlType::Timestamp => "DATETIME",
            SqlType::LongVarChar | SqlType::LongNVarChar => "LONGTEXT",
            SqlType::Clob | SqlType::NClob => "TEXT",
            SqlType::LongVarBinary => "LONGBLOB",
            other => other.name(),
        }
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    /// Backslash is an escape character in MySQL string literals (unless
    /// NO_BACKSLASH_ESCAPES is set, in which case doubling is still correct).
    fn escape_text(&self, text: &str) -> String {
        text.replace('\\', "\\\\").replace('\'', "''")
    }

    fn modify_column(&self, table: &str, column: &ColumnDef) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            table,
            self.column_definition(column)
        ))
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("RENAME TABLE {} TO {}", from, to)
    }

    fn insert_defaults(&self, table: &str) -> String {
        format!("INSERT INTO {} () VALUES ()", table)
    }
}
