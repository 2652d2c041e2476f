//! DML statement text for table operations.
//!
//! Values are rendered as escaped literals by the dialect. Every column name
//! is checked against the table's schema and written in its schema spelling.

use crate::core::{ColumnDef, ColumnSet, Value};
use crate::dialect::Dialect;
use crate::error::{CobraError, Result};
use crate::row::Row;

fn resolve<'a>(columns: &'a ColumnSet, table: &str, name: &str) -> Result<&'a ColumnDef> {
    columns
        .get(name)
        .ok_or_else(|| CobraError::unknown_column(table, name))
}

fn assignment(dialect: &impl Dialect, column: &ColumnDef, value: &Value) -> String {
    format!("{} = {}", column.name(), dialect.literal(value))
}

/// Equality test; NULL never compares equal, so it is matched with `IS NULL`.
fn condition(dialect: &impl Dialect, column: &ColumnDef, value: &Value) -> String {
    if value.is_null() {
        format!("{} IS NULL", column.name())
    } else {
        assignment(dialect, column, value)
    }
}

/// Positional INSERT over every column except a generated primary key.
pub(crate) fn insert(
    dialect: &impl Dialect,
    table: &str,
    columns: &ColumnSet,
    values: &[Value],
) -> Result<String> {
    let targets: Vec<&ColumnDef> = columns.insertable().collect();
    if targets.len() != values.len() {
        return Err(CobraError::ValueCount {
            table: table.to_string(),
            expected: targets.len(),
            actual: values.len(),
        });
    }
    if targets.is_empty() {
        return Ok(dialect.insert_defaults(table));
    }

    let names = targets.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ");
    let literals = values
        .iter()
        .map(|v| dialect.literal(v))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("INSERT INTO {} ({}) VALUES ({})", table, names, literals))
}

/// UPDATE every non-key column present in `row`, matched by primary key.
pub(crate) fn update_row(
    dialect: &impl Dialect,
    table: &str,
    columns: &ColumnSet,
    row: &Row,
) -> Result<String> {
    let pk = columns
        .primary_key()
        .ok_or_else(|| CobraError::NoPrimaryKey(table.to_string()))?;
    let key = row
        .get(pk.name())
        .filter(|v| !v.is_null())
        .ok_or_else(|| {
            CobraError::InvalidRow(format!("no value for primary key {}", pk.name()))
        })?;

    let mut assignments = Vec::with_capacity(row.len());
    for (name, value) in row.iter() {
        let column = resolve(columns, table, name)?;
        if !column.is_primary() {
            assignments.push(assignment(dialect, column, value));
        }
    }
    if assignments.is_empty() {
        return Err(CobraError::InvalidRow(format!(
            "nothing to update besides primary key {}",
            pk.name()
        )));
    }

    Ok(format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments.join(", "),
        condition(dialect, pk, key)
    ))
}

/// UPDATE one column on every row where it currently equals `old`.
pub(crate) fn update_matching(
    dialect: &impl Dialect,
    table: &str,
    columns: &ColumnSet,
    column: &str,
    old: &Value,
    new: &Value,
) -> Result<String> {
    let column = resolve(columns, table, column)?;
    Ok(format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignment(dialect, column, new),
        condition(dialect, column, old)
    ))
}

/// DELETE rows equal to `row` on every column it holds.
pub(crate) fn delete_row(
    dialect: &impl Dialect,
    table: &str,
    columns: &ColumnSet,
    row: &Row,
) -> Result<String> {
    if row.is_empty() {
        return Err(CobraError::InvalidRow("cannot match an empty row".into()));
    }
    let conditions = row
        .iter()
        .map(|(name, value)| -> Result<String> {
            Ok(condition(dialect, resolve(columns, table, name)?, value))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "DELETE FROM {} WHERE {}",
        table,
        conditions.join(" AND ")
    ))
}

/// DELETE every row where `column` equals `value`.
pub(crate) fn delete_matching(
    dialect: &impl Dialect,
    table: &str,
    columns: &ColumnSet,
    column: &str,
    value: &Value,
) -> Result<String> {
    let column = resolve(columns, table, column)?;
    Ok(format!(
        "DELETE FROM {} WHERE {}",
        table,
        condition(dialect, column, value)
    ))
}

/// SELECT `select` (all columns when empty) where `column` equals `value`.
pub(crate) fn select(
    dialect: &impl Dialect,
    table: &str,
    columns: &ColumnSet,
    select: &[&str],
    column: &str,
    value: &Value,
) -> Result<String> {
    let projection = if select.is_empty() {
        columns.names().join(", ")
    } else {
        select
            .iter()
            .map(|name| resolve(columns, table, name).map(ColumnDef::name))
            .collect::<Result<Vec<_>>>()?
            .join(", ")
    };
    let column = resolve(columns, table, column)?;
    Ok(format!(
        "SELECT {} FROM {} WHERE {}",
        projection,
        table,
        condition(dialect, column, value)
    ))
}
