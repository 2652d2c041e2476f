//! MySQL/MariaDB driver.
//!
//! Introspection uses INFORMATION_SCHEMA in the connection's current
//! database. String columns are CAST to CHAR and numbers to SIGNED to avoid
//! collation and width differences between server versions.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, MySql, MySqlConnection, Row, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use super::{column_from_catalog, representation_for, resolve_type, rollback, Record, TableSchema};
use crate::config::MysqlConfig;
use crate::core::{ColumnFlags, ColumnSet, HostType, SqlType, Value};
use crate::error::{CobraError, Result};

pub(super) async fn open(config: &MysqlConfig, timeout: Duration) -> Result<MySqlConnection> {
    let context = format!(
        "connecting to MySQL {}:{}/{}",
        config.host, config.port, config.database
    );
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password);

    let conn = tokio::time::timeout(timeout, options.connect())
        .await
        .map_err(|_| CobraError::connection(format!("timed out after {:?}", timeout), &context))?
        .map_err(|e| CobraError::connection(e, &context))?;

    info!(
        "Connected to MySQL: {}:{}/{}",
        config.host, config.port, config.database
    );
    Ok(conn)
}

pub(super) async fn execute(conn: &mut MySqlConnection, sql: &str) -> Result<u64> {
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
    conn: &mut MySqlConnection,
    sql: &str,
    columns: Option<&ColumnSet>,
) -> Result<Vec<Record>> {
    let mut tx = conn.begin().await?;
    let rows: Vec<MySqlRow> = match sqlx::query(sql).fetch_all(&mut *tx).await {
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
    conn: &mut MySqlConnection,
    table: &str,
) -> Result<Option<TableSchema>> {
    let found: Option<MySqlRow> = sqlx::query(
        r#"
        SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = DATABASE() AND LOWER(TABLE_NAME) = LOWER(?)
        "#,
    )
    .bind(table)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(found) = found else {
        return Ok(None);
    };
    let name: String = found.try_get("TABLE_NAME")?;

    let primary_key = load_primary_key(conn, &name).await?;
    if primary_key.len() > 1 {
        warn!(table = %name, "Composite primary key; columns loaded without a primary key");
    }

    let rows: Vec<MySqlRow> = sqlx::query(
        r#"
        SELECT
            CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
            CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
            CAST(COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
            CAST(CASE
                WHEN CHARACTER_MAXIMUM_LENGTH IS NULL THEN 0
                WHEN CHARACTER_MAXIMUM_LENGTH > 2147483647 THEN -1
                ELSE CHARACTER_MAXIMUM_LENGTH
            END AS SIGNED) AS max_length,
            CAST(COALESCE(NUMERIC_PRECISION, 0) AS SIGNED) AS num_precision,
            CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS num_scale,
            CAST(COALESCE(DATETIME_PRECISION, 0) AS SIGNED) AS dt_precision,
            CAST(IF(IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable,
            CAST(IF(EXTRA LIKE '%auto_increment%', 1, 0) AS SIGNED) AS is_identity
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(&name)
    .fetch_all(&mut *conn)
    .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let column: String = row.try_get("COLUMN_NAME")?;
        let data_type: String = row.try_get("DATA_TYPE")?;
        let column_type = row.try_get::<String, _>("COLUMN_TYPE")?.to_ascii_lowercase();
        let sql_type = map_data_type(&column, &data_type, &column_type)?;

        let precision = match sql_type {
            SqlType::Char
            | SqlType::VarChar
            | SqlType::Binary
            | SqlType::VarBinary
            | SqlType::NChar
            | SqlType::NVarChar => row.try_get::<i64, _>("max_length")?,
            SqlType::Bit | SqlType::Numeric | SqlType::Decimal => {
                row.try_get::<i64, _>("num_precision")?
            }
            SqlType::Time | SqlType::Timestamp => row.try_get::<i64, _>("dt_precision")?,
            _ => -1,
        };
        let scale = row.try_get::<i64, _>("num_scale")?;

        let primary = primary_key.len() == 1 && primary_key[0] == column;
        let flags = ColumnFlags {
            primary,
            autoincrement: primary && row.try_get::<i64, _>("is_identity")? == 1,
            not_null: primary || row.try_get::<i64, _>("is_nullable")? == 0,
            unsigned: column_type.contains("unsigned"),
        };

        columns.push(column_from_catalog(
            &column,
            sql_type,
            u32::try_from(precision).ok(),
            u32::try_from(scale).ok(),
            flags,
        )?);
    }

    debug!(table = %name, columns = columns.len(), "Introspected MySQL table");
    Ok(Some(TableSchema { name, columns }))
}

/// Load primary key column names for a table.
async fn load_primary_key(conn: &mut MySqlConnection, table: &str) -> Result<Vec<String>> {
    let rows: Vec<MySqlRow> = sqlx::query(
        r#"
        SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
        FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("COLUMN_NAME").map_err(CobraError::from))
        .collect()
}

/// Map INFORMATION_SCHEMA type names to registered types. `tinyint(1)` is
/// MySQL's spelling of BOOLEAN.
fn map_data_type(column: &str, data_type: &str, column_type: &str) -> Result<SqlType> {
    if data_type.eq_ignore_ascii_case("tinyint") && column_type.starts_with("tinyint(1)") {
        return Ok(SqlType::Boolean);
    }
    resolve_type(column, data_type)
}

/// Convert a MySQL row to a name/value record.
fn row_to_record(row: &MySqlRow, columns: Option<&ColumnSet>) -> Record {
    row.columns()
        .iter()
        .map(|col| {
            let rep = representation_for(columns, col.name(), col.type_info().name());
            (col.name().to_string(), decode_value(row, col.ordinal(), rep))
        })
        .collect()
}

fn get<'r, T>(row: &'r MySqlRow, i: usize) -> Option<T>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<T, _>(i).ok()
}

/// Decode one value into the wanted representation, trying the signed and
/// unsigned variants sqlx distinguishes for integer columns.
fn decode_value(row: &MySqlRow, i: usize, rep: Option<HostType>) -> Value {
    let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return Value::Null;
    }

    let decoded = match rep {
        Some(HostType::Bool) => get::<bool>(row, i)
            .or_else(|| get::<i64>(row, i).map(|v| v != 0))
            .or_else(|| get::<u64>(row, i).map(|v| v != 0))
            .map(Value::Bool),
        Some(HostType::I32) => get::<i32>(row, i)
            .map(Value::I32)
            .or_else(|| get::<i64>(row, i).map(Value::I64))
            .or_else(|| get::<u32>(row, i).map(|v| Value::I64(i64::from(v))))
            .or_else(|| get::<u64>(row, i).map(unsigned_value)),
        Some(HostType::I64) => get::<i64>(row, i)
            .map(Value::I64)
            .or_else(|| get::<u64>(row, i).map(unsigned_value)),
        Some(HostType::U64) => get::<u64>(row, i)
            .map(Value::U64)
            .or_else(|| get::<i64>(row, i).map(Value::I64)),
        Some(HostType::F32) => get::<f32>(row, i)
            .or_else(|| get::<f64>(row, i).map(|v| v as f32))
            .map(Value::F32),
        Some(HostType::F64) => get::<f64>(row, i)
            .or_else(|| get::<f32>(row, i).map(f64::from))
            .map(Value::F64),
        Some(HostType::Decimal) => get::<Decimal>(row, i)
            .or_else(|| get::<String>(row, i).and_then(|s| s.trim().parse().ok()))
            .map(Value::Decimal),
        Some(HostType::Text) => get::<String>(row, i)
            .or_else(|| get::<Vec<u8>>(row, i).map(|b| String::from_utf8_lossy(&b).into_owned()))
            .map(Value::Text),
        Some(HostType::Bytes) => get::<Vec<u8>>(row, i).map(Value::Bytes),
        Some(HostType::Date) => get::<NaiveDate>(row, i).map(Value::Date),
        Some(HostType::Time) => get::<NaiveTime>(row, i).map(Value::Time),
        Some(HostType::Timestamp) => get::<NaiveDateTime>(row, i).map(Value::Timestamp),
        None => None,
    };

    decoded.unwrap_or_else(|| decode_any(row, i))
}

/// Unsigned integers that fit stay `I64` so callers see one integer shape.
fn unsigned_value(v: u64) -> Value {
    i64::try_from(v).map_or(Value::U64(v), Value::I64)
}

fn decode_any(row: &MySqlRow, i: usize) -> Value {
    get::<i64>(row, i)
        .map(Value::I64)
        .or_else(|| get::<u64>(row, i).map(unsigned_value))
        .or_else(|| get::<f64>(row, i).map(Value::F64))
        .or_else(|| get::<Decimal>(row, i).map(Value::Decimal))
        .or_else(|| get::<NaiveDateTime>(row, i).map(Value::Timestamp))
        .or_else(|| get::<NaiveDate>(row, i).map(Value::Date))
        .or_else(|| get::<NaiveTime>(row, i).map(Value::Time))
        .or_else(|| get::<String>(row, i).map(Value::Text))
        .or_else(|| get::<Vec<u8>>(row, i).map(Value::Bytes))
        .unwrap_or(Value::Null)
}
