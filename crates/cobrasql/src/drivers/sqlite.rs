//! SQLite driver.
//!
//! Introspection reads `sqlite_master` for the table (matched without regard
//! to case) and `PRAGMA table_info` for its columns. SQLite reports declared
//! type text verbatim, so sizes and `UNSIGNED` are parsed from it. An
//! `INTEGER PRIMARY KEY AUTOINCREMENT` key is read back as unsigned, since
//! SQLite never hands out negative values for it.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, Sqlite, SqliteConnection, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use super::{
    column_from_catalog, parse_declared_type, representation_for, resolve_type, rollback, Record,
    TableSchema,
};
use crate::config::SqliteConfig;
use crate::core::identifier::quote_sqlite;
use crate::core::{ColumnFlags, ColumnSet, HostType, SqlType, Value};
use crate::error::{CobraError, Result};

pub(super) async fn open(config: &SqliteConfig, timeout: Duration) -> Result<SqliteConnection> {
    let context = format!("opening SQLite database {}", config.path.display());
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(config.create_if_missing);

    let conn = tokio::time::timeout(timeout, options.connect())
        .await
        .map_err(|_| CobraError::connection(format!("timed out after {:?}", timeout), &context))?
        .map_err(|e| CobraError::connection(e, &context))?;

    info!("Opened SQLite database: {}", config.path.display());
    Ok(conn)
}

pub(super) async fn execute(conn: &mut SqliteConnection, sql: &str) -> Result<u64> {
    let mut tx = conn.begin().await?;
    match sqlx::query(sql).execute(&mut *tx).await {
        Ok(done) => {
            tx.commit().await?;
            Ok(done.rows_affected())
        }
        Err(e) => {
            rollback(tx, sql).await;
            Err(CobraError::statement(sql, e))
        }
    }
}

pub(super) async fn query(
    conn: &mut SqliteConnection,
    sql: &str,
    columns: Option<&ColumnSet>,
) -> Result<Vec<Record>> {
    let mut tx = conn.begin().await?;
    let rows: Vec<SqliteRow> = match sqlx::query(sql).fetch_all(&mut *tx).await {
        Ok(rows) => rows,
        Err(e) => {
            rollback(tx, sql).await;
            return Err(CobraError::statement(sql, e));
        }
    };
    tx.commit().await?;

    Ok(rows.iter().map(|row| row_to_record(row, columns)).collect())
}

pub(super) async fn introspect(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Option<TableSchema>> {
    let found: Option<SqliteRow> = sqlx::query(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
    )
    .bind(table)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(found) = found else {
        return Ok(None);
    };
    let name: String = found.try_get("name")?;
    let create_sql = found
        .try_get::<Option<String>, _>("sql")?
        .unwrap_or_default();
    let declared_autoincrement = declares_autoincrement(&create_sql);

    let rows: Vec<SqliteRow> = sqlx::query(&format!("PRAGMA table_info({})", quote_sqlite(&name)))
        .fetch_all(&mut *conn)
        .await?;

    let pk_count = rows
        .iter()
        .filter(|r| r.try_get::<i64, _>("pk").unwrap_or(0) > 0)
        .count();
    if pk_count > 1 {
        warn!(table = %name, "Composite primary key; columns loaded without a primary key");
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let column: String = row.try_get("name")?;
        let declared = parse_declared_type(&row.try_get::<String, _>("type")?);
        let sql_type = resolve_type(&column, &declared.base)?;

        let primary = pk_count == 1 && row.try_get::<i64, _>("pk")? > 0;
        let autoincrement = primary && sql_type == SqlType::Integer && declared_autoincrement;
        let flags = ColumnFlags {
            primary,
            autoincrement,
            not_null: primary || row.try_get::<i64, _>("notnull")? != 0,
            unsigned: declared.unsigned || autoincrement,
        };

        columns.push(column_from_catalog(
            &column,
            sql_type,
            declared.precision,
            declared.scale,
            flags,
        )?);
    }

    debug!(table = %name, columns = columns.len(), "Introspected SQLite table");
    Ok(Some(TableSchema { name, columns }))
}

/// True if the CREATE statement carries the `AUTOINCREMENT` keyword.
///
/// SQLite only accepts the keyword on an `INTEGER PRIMARY KEY` column, so a
/// bare keyword token is enough. Quoted identifiers, string literals and
/// comments are skipped, and identifiers that merely contain the word do not
/// count.
fn declares_autoincrement(create_sql: &str) -> bool {
    let mut chars = create_sql.chars().peekable();
    let mut word = String::new();

    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            word.push(c);
            continue;
        }
        if word.eq_ignore_ascii_case("AUTOINCREMENT") {
            return true;
        }
        word.clear();

        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                for d in chars.by_ref() {
                    if d == close {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for d in chars.by_ref() {
                    if d == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for d in chars.by_ref() {
                    if prev == '*' && d == '/' {
                        break;
                    }
                    prev = d;
                }
            }
            _ => {}
        }
    }
    word.eq_ignore_ascii_case("AUTOINCREMENT")
}

/// Convert a SQLite row to a name/value record.
fn row_to_record(row: &SqliteRow, columns: Option<&ColumnSet>) -> Record {
    row.columns()
        .iter()
        .map(|col| {
            let rep = representation_for(columns, col.name(), col.type_info().name());
            (col.name().to_string(), decode_value(row, col.ordinal(), rep))
        })
        .collect()
}

fn get<'r, T>(row: &'r SqliteRow, i: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get::<T, _>(i).ok()
}

/// Decode one value into the wanted representation. SQLite stores values by
/// affinity, not declared type, so every branch falls back to whatever the
/// stored value actually is.
fn decode_value(row: &SqliteRow, i: usize, rep: Option<HostType>) -> Value {
    let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return Value::Null;
    }

    let decoded = match rep {
        Some(HostType::Bool) => get::<bool>(row, i)
            .or_else(|| get::<i64>(row, i).map(|v| v != 0))
            .map(Value::Bool),
        Some(HostType::I32) => {
            get::<i64>(row, i).map(|v| i32::try_from(v).map_or(Value::I64(v), Value::I32))
        }
        Some(HostType::I64) => get::<i64>(row, i).map(Value::I64),
        Some(HostType::U64) => {
            get::<i64>(row, i).map(|v| u64::try_from(v).map_or(Value::I64(v), Value::U64))
        }
        Some(HostType::F32) => get::<f64>(row, i)
            .or_else(|| get::<i64>(row, i).map(|v| v as f64))
            .map(|v| Value::F32(v as f32)),
        Some(HostType::F64) => get::<f64>(row, i)
            .or_else(|| get::<i64>(row, i).map(|v| v as f64))
            .map(Value::F64),
        Some(HostType::Decimal) => get::<String>(row, i)
            .and_then(|s| s.trim().parse::<Decimal>().ok())
            .or_else(|| get::<f64>(row, i).and_then(|f| Decimal::try_from(f).ok()))
            .or_else(|| get::<i64>(row, i).map(Decimal::from))
            .map(Value::Decimal),
        Some(HostType::Text) => get::<String>(row, i).map(Value::Text),
        Some(HostType::Bytes) => get::<Vec<u8>>(row, i).map(Value::Bytes),
        Some(HostType::Date) => get::<NaiveDate>(row, i).map(Value::Date),
        Some(HostType::Time) => get::<NaiveTime>(row, i).map(Value::Time),
        Some(HostType::Timestamp) => get::<NaiveDateTime>(row, i).map(Value::Timestamp),
        None => None,
    };

    decoded.unwrap_or_else(|| decode_stored(row, i))
}

/// Decode by storage class alone.
fn decode_stored(row: &SqliteRow, i: usize) -> Value {
    get::<i64>(row, i)
        .map(Value::I64)
        .or_else(|| get::<f64>(row, i).map(Value::F64))
        .or_else(|| get::<String>(row, i).map(Value::Text))
        .or_else(|| get::<Vec<u8>>(row, i).map(Value::Bytes))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoincrement_keyword_detected() {
        assert!(declares_autoincrement(
            "CREATE TABLE t (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, name TEXT)"
        ));
        assert!(declares_autoincrement(
            "create table t (id integer primary key\n    autoincrement)"
        ));
    }

    #[test]
    fn test_autoincrement_inside_names_and_literals_ignored() {
        assert!(!declares_autoincrement(
            "CREATE TABLE hits (id INTEGER PRIMARY KEY, autoincrement_hint INTEGER)"
        ));
        assert!(!declares_autoincrement(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT DEFAULT 'autoincrement')"
        ));
        assert!(!declares_autoincrement(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, \"autoincrement\" INTEGER)"
        ));
        assert!(!declares_autoincrement(
            "CREATE TABLE t (id INTEGER PRIMARY KEY -- no autoincrement\n)"
        ));
        assert!(!declares_autoincrement(
            "CREATE TABLE t (id INTEGER PRIMARY KEY /* autoincrement */)"
        ));
    }
}
