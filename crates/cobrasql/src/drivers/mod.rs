//! Database drivers.
//!
//! One physical connection per engine, wrapped in [`DbConnection`]. Each
//! driver module provides the same set of operations:
//!
//! - open / ping / close
//! - transactional statement execution with rollback on failure
//! - result decoding into [`Value`]s by column representation
//! - schema introspection into [`ColumnDef`]s
//!
//! # Feature Flags
//!
//! - `sqlite`: embedded SQLite databases (sqlx `sqlite`)
//! - `mysql`: MySQL 5.7+/8.0+ and MariaDB 10.2+ (sqlx `mysql`)
//!
//! Asking for a database whose driver was compiled out fails with
//! [`CobraError::DriverUnavailable`].

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::time::Duration;

use tracing::{error, warn};

use crate::config::DatabaseConfig;
use crate::core::{lookup, ColumnDef, ColumnFlags, ColumnSet, HostType, SqlType, Value};
use crate::error::{CobraError, Result};

/// One decoded result row: column names (as reported by the database) with values.
pub type Record = Vec<(String, Value)>;

/// Column definitions read back from a live database.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name as stored in the catalog.
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

/// A single open database connection.
pub enum DbConnection {
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqliteConnection),
    #[cfg(feature = "mysql")]
    Mysql(sqlx::MySqlConnection),
}

impl DbConnection {
    /// Open a connection, bounded by `timeout`.
    pub async fn open(config: &DatabaseConfig, timeout: Duration) -> Result<Self> {
        match config {
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(c) => sqlite::open(c, timeout).await.map(DbConnection::Sqlite),
            #[cfg(not(feature = "sqlite"))]
            DatabaseConfig::Sqlite(_) => Err(CobraError::DriverUnavailable("sqlite")),
            #[cfg(feature = "mysql")]
            DatabaseConfig::Mysql(c) => mysql::open(c, timeout).await.map(DbConnection::Mysql),
            #[cfg(not(feature = "mysql"))]
            DatabaseConfig::Mysql(_) => Err(CobraError::DriverUnavailable("mysql")),
        }
    }

    /// Liveness probe.
    pub async fn ping(&mut self) -> Result<()> {
        use sqlx::Connection;
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => conn.ping().await?,
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(conn) => conn.ping().await?,
        }
        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<()> {
        use sqlx::Connection;
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => conn.close().await?,
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(conn) => conn.close().await?,
        }
        Ok(())
    }

    /// Run one statement in its own transaction and return the affected row count.
    ///
    /// On failure the transaction is rolled back (failures of the rollback
    /// itself are only logged) and the statement error is returned.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::execute(conn, sql).await,
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(conn) => mysql::execute(conn, sql).await,
        }
    }

    /// Run a query in its own transaction and decode every row.
    ///
    /// Values of columns found in `columns` decode into that column's host
    /// representation; other columns are decoded from the reported type.
    pub async fn query(&mut self, sql: &str, columns: Option<&ColumnSet>) -> Result<Vec<Record>> {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::query(conn, sql, columns).await,
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(conn) => mysql::query(conn, sql, columns).await,
        }
    }

    /// Read a table's columns from the catalog. `Ok(None)` if no table of
    /// that name (case-insensitive) exists.
    pub async fn introspect(&mut self, table: &str) -> Result<Option<TableSchema>> {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => sqlite::introspect(conn, table).await,
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(conn) => mysql::introspect(conn, table).await,
        }
    }

    /// Short name of the connected database kind.
    pub fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(_) => "sqlite",
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(_) => "mysql",
        }
    }
}

/// Roll back a failed statement's transaction. Rollback failures are logged, not returned.
pub(crate) async fn rollback<DB: sqlx::Database>(tx: sqlx::Transaction<'_, DB>, sql: &str) {
    warn!(statement = %sql, "Statement failed, rolling back");
    if let Err(e) = tx.rollback().await {
        error!(error = %e, statement = %sql, "Rollback failed");
    }
}

/// A declared column type split into its parts, e.g.
/// `DECIMAL(8,2) UNSIGNED` -> (`DECIMAL`, 8, 2, unsigned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclaredType {
    pub base: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
}

/// Parse a declared type name as found in `CREATE TABLE` text or
/// `INFORMATION_SCHEMA.COLUMNS.COLUMN_TYPE`.
pub(crate) fn parse_declared_type(declared: &str) -> DeclaredType {
    let upper = declared.trim().to_ascii_uppercase();

    let (head, args, tail) = match (upper.find('('), upper.find(')')) {
        (Some(open), Some(close)) if close > open => (
            &upper[..open],
            Some(&upper[open + 1..close]),
            &upper[close + 1..],
        ),
        _ => (upper.as_str(), None, ""),
    };

    let mut unsigned = false;
    let mut words = Vec::new();
    for word in head.split_whitespace().chain(tail.split_whitespace()) {
        match word {
            "UNSIGNED" => unsigned = true,
            "SIGNED" | "ZEROFILL" => {}
            other => words.push(other),
        }
    }

    let mut precision = None;
    let mut scale = None;
    if let Some(args) = args {
        let mut parts = args.split(',').map(|p| p.trim().parse::<u32>().ok());
        precision = parts.next().flatten();
        scale = parts.next().flatten();
    }

    DeclaredType {
        base: words.join(" "),
        precision,
        scale,
        unsigned,
    }
}

/// Rebuild a column definition from catalog metadata.
///
/// Precision and scale are taken from the catalog only for types that spell
/// them in DDL; all others get the descriptor defaults.
pub(crate) fn column_from_catalog(
    name: &str,
    sql_type: SqlType,
    precision: Option<u32>,
    scale: Option<u32>,
    flags: ColumnFlags,
) -> Result<ColumnDef> {
    let d = sql_type.descriptor();
    let precision = if d.sized { precision } else { None };
    let scale = if d.scaled { scale } else { None };

    let mut builder = ColumnDef::builder(name, sql_type).flags(flags);
    if let Some(p) = precision {
        builder = builder.precision(p);
    }
    if let Some(s) = scale {
        builder = builder.scale(s);
    }
    builder.build()
}

/// Resolve a catalog type name to a registered type.
pub(crate) fn resolve_type(column: &str, type_name: &str) -> Result<SqlType> {
    lookup(type_name)
        .map(|d| d.sql_type)
        .ok_or_else(|| CobraError::UnsupportedType {
            column: column.to_string(),
            type_name: type_name.to_string(),
        })
}

/// Representation for a result column: the schema's column if known, else
/// whatever the reported type name resolves to.
pub(crate) fn representation_for(
    columns: Option<&ColumnSet>,
    name: &str,
    reported_type: &str,
) -> Option<HostType> {
    if let Some(col) = columns.and_then(|c| c.get(name)) {
        return Some(col.representation());
    }
    let declared = parse_declared_type(reported_type);
    lookup(&declared.base).map(|d| {
        d.representation(
            declared.precision.unwrap_or(d.precision.default),
            declared.unsigned,
        )
    })
}
