//! SQL dialects (Strategy pattern).
//!
//! A [`Dialect`] knows how one database spells column types, constraint
//! keywords, literals and DDL. Engines hold a [`DialectImpl`], which
//! dispatches to the concrete dialect with a plain `match` instead of a
//! vtable.
//!
//! Identifiers are emitted unquoted. Every name reaching these builders has
//! passed [`validate_identifier`](crate::core::validate_identifier) or
//! belongs to a validated [`ColumnDef`].

mod mysql;
mod sqlite;

pub use mysql::MysqlDialect;
pub use sqlite::SqliteDialect;

use crate::core::{ColumnDef, ColumnSet, SqlType, Value};
use crate::error::{CobraError, Result};

/// Per-database SQL spelling.
pub trait Dialect: Send + Sync {
    /// Dialect identifier ("sqlite", "mysql").
    fn name(&self) -> &'static str;

    /// Type keyword for a column type, without size.
    fn base_type(&self, sql_type: SqlType) -> &'static str;

    /// Keyword marking an auto-increment column.
    fn autoincrement_keyword(&self) -> &'static str;

    /// Escape text for use between single quotes.
    fn escape_text(&self, text: &str) -> String {
        text.replace('\'', "''")
    }

    /// Whether `UNSIGNED` is written for this column.
    fn emits_unsigned(&self, column: &ColumnDef) -> bool {
        column.is_unsigned()
    }

    /// `ALTER TABLE ... MODIFY COLUMN`, if the database has it.
    fn modify_column(&self, table: &str, column: &ColumnDef) -> Result<String>;

    fn rename_table(&self, from: &str, to: &str) -> String;

    /// INSERT of a row made up entirely of column defaults.
    fn insert_defaults(&self, table: &str) -> String {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    }

    /// Full type spelling including precision and scale.
    fn column_type(&self, column: &ColumnDef) -> String {
        let d = column.descriptor();
        let base = self.base_type(column.sql_type());
        let fractional_seconds = matches!(column.sql_type(), SqlType::Time | SqlType::Timestamp);

        if d.scaled {
            format!("{}({},{})", base, column.precision(), column.scale())
        } else if d.sized && !(fractional_seconds && column.precision() == 0) {
            format!("{}({})", base, column.precision())
        } else {
            base.to_string()
        }
    }

    /// Render a value as a SQL literal.
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bytes(_) => format!("X'{}'", value),
            other => format!("'{}'", self.escape_text(&other.to_string())),
        }
    }

    /// One column definition inside CREATE TABLE / ALTER TABLE.
    fn column_definition(&self, column: &ColumnDef) -> String {
        let mut def = format!("{} {}", column.name(), self.column_type(column));
        if self.emits_unsigned(column) {
            def.push_str(" UNSIGNED");
        }
        if column.is_not_null() {
            def.push_str(" NOT NULL");
        }
        if column.is_primary() {
            def.push_str(" PRIMARY KEY");
        }
        if column.is_autoincrement() {
            def.push(' ');
            def.push_str(self.autoincrement_keyword());
        }
        def
    }

    fn create_table(&self, table: &str, columns: &ColumnSet) -> String {
        let definitions = columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", table, definitions)
    }

    fn add_column(&self, table: &str, column: &ColumnDef) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            table,
            self.column_definition(column)
        )
    }

    fn drop_column(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", table, column)
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", table)
    }
}

/// Enum-based static dispatch for dialects.
///
/// Only the required trait methods are forwarded; provided methods run on
/// the enum itself and reach the concrete spelling through them.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Sqlite(SqliteDialect),
    Mysql(MysqlDialect),
}

impl Dialect for DialectImpl {
    fn name(&self) -> &'static str {
        match self {
            DialectImpl::Sqlite(d) => d.name(),
            DialectImpl::Mysql(d) => d.name(),
        }
    }

    fn base_type(&self, sql_type: SqlType) -> &'static str {
        match self {
            DialectImpl::Sqlite(d) => d.base_type(sql_type),
            DialectImpl::Mysql(d) => d.base_type(sql_type),
        }
    }

    fn autoincrement_keyword(&self) -> &'static str {
        match self {
            DialectImpl::Sqlite(d) => d.autoincrement_keyword(),
            DialectImpl::Mysql(d) => d.autoincrement_keyword(),
        }
    }

    fn escape_text(&self, text: &str) -> String {
        match self {
            DialectImpl::Sqlite(d) => d.escape_text(text),
            DialectImpl::Mysql(d) => d.escape_text(text),
        }
    }

    fn emits_unsigned(&self, column: &ColumnDef) -> bool {
        match self {
            DialectImpl::Sqlite(d) => d.emits_unsigned(column),
            DialectImpl::Mysql(d) => d.emits_unsigned(column),
        }
    }

    fn modify_column(&self, table: &str, column: &ColumnDef) -> Result<String> {
        match self {
            DialectImpl::Sqlite(d) => d.modify_column(table, column),
            DialectImpl::Mysql(d) => d.modify_column(table, column),
        }
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        match self {
            DialectImpl::Sqlite(d) => d.rename_table(from, to),
            DialectImpl::Mysql(d) => d.rename_table(from, to),
        }
    }

    fn insert_defaults(&self, table: &str) -> String {
        match self {
            DialectImpl::Sqlite(d) => d.insert_defaults(table),
            DialectImpl::Mysql(d) => d.insert_defaults(table),
        }
    }
}

impl DialectImpl {
    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DialectImpl::Sqlite(SqliteDialect::new())),
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            other => Err(CobraError::Config(format!(
                "Unknown database type: '{}'. Supported types: sqlite, mysql",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PrimaryKeyPolicy;

    fn users() -> ColumnSet {
        ColumnSet::from_columns(
            [
                ColumnDef::builder("id", SqlType::Integer)
                    .primary()
                    .autoincrement()
                    .unsigned()
                    .build()
                    .unwrap(),
                ColumnDef::builder("name", SqlType::VarChar)
                    .precision(50)
                    .not_null()
                    .build()
                    .unwrap(),
            ],
            PrimaryKeyPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_dialect_impl_from_db_type() {
        assert_eq!(DialectImpl::from_db_type("SQLite").unwrap().name(), "sqlite");
        assert_eq!(DialectImpl::from_db_type("mysql").unwrap().name(), "mysql");
        assert!(DialectImpl::from_db_type("mariadb").is_ok());
        assert!(DialectImpl::from_db_type("postgres").is_err());
    }

    #[test]
    fn test_create_table_per_dialect() {
        let sqlite = DialectImpl::from_db_type("sqlite").unwrap();
        assert_eq!(
            sqlite.create_table("users", &users()),
            "CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             name VARCHAR(50) NOT NULL)"
        );

        let mysql = DialectImpl::from_db_type("mysql").unwrap();
        assert_eq!(
            mysql.create_table("users", &users()),
            "CREATE TABLE users (id INT UNSIGNED NOT NULL PRIMARY KEY AUTO_INCREMENT, \
             name VARCHAR(50) NOT NULL)"
        );
    }

    #[test]
    fn test_literals() {
        let sqlite = DialectImpl::Sqlite(SqliteDialect::new());
        let mysql = DialectImpl::Mysql(MysqlDialect::new());

        assert_eq!(sqlite.literal(&Value::Null), "NULL");
        assert_eq!(sqlite.literal(&Value::from("O'Brien")), "'O''Brien'");
        assert_eq!(sqlite.literal(&Value::from(r"a\b")), r"'a\b'");
        assert_eq!(mysql.literal(&Value::from(r"a\'b")), r"'a\\''b'");
        assert_eq!(mysql.literal(&Value::I32(42)), "'42'");
        assert_eq!(mysql.literal(&Value::Bytes(vec![0xde, 0xad])), "X'DEAD'");
    }

    #[test]
    fn test_column_type_sizes() {
        let d = DialectImpl::Sqlite(SqliteDialect::new());
        let dec = ColumnDef::builder("price", SqlType::Decimal)
            .precision(8)
            .scale(2)
            .build()
            .unwrap();
        assert_eq!(d.column_type(&dec), "DECIMAL(8,2)");

        let ts = ColumnDef::builder("at", SqlType::Timestamp).build().unwrap();
        assert_eq!(d.column_type(&ts), "TIMESTAMP");
        let ts3 = ColumnDef::builder("at", SqlType::Timestamp)
            .precision(3)
            .build()
            .unwrap();
        assert_eq!(d.column_type(&ts3), "TIMESTAMP(3)");

        let text = ColumnDef::builder("body", SqlType::Clob).build().unwrap();
        assert_eq!(d.column_type(&text), "CLOB");
    }

    #[test]
    fn test_alter_statements() {
        let d = DialectImpl::Mysql(MysqlDialect::new());
        let age = ColumnDef::builder("age", SqlType::SmallInt)
            .unsigned()
            .build()
            .unwrap();
        assert_eq!(
            d.add_column("users", &age),
            "ALTER TABLE users ADD COLUMN age SMALLINT UNSIGNED"
        );
        assert_eq!(d.drop_column("users", "age"), "ALTER TABLE users DROP COLUMN age");
        assert_eq!(d.drop_table("users"), "DROP TABLE users");
        assert_eq!(d.insert_defaults("users"), "INSERT INTO users () VALUES ()");
        assert_eq!(
            DialectImpl::Sqlite(SqliteDialect::new()).insert_defaults("users"),
            "INSERT INTO users DEFAULT VALUES"
        );
    }
}
