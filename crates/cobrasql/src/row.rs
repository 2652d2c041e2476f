//! Rows: column name to value, in column order.

use std::collections::HashMap;

use crate::core::Value;
use crate::drivers::Record;
use crate::engine::Completion;
use crate::error::{CobraError, Result};
use crate::table::Table;

/// One record, retrieved from a query or prepared for a write.
///
/// Column names are matched case-insensitively. A row attached to a
/// [`Table`] only accepts that table's columns and can write itself back
/// with [`persist`](Row::persist) / [`delete`](Row::delete). Rows returned by
/// [`Engine::run_query`](crate::Engine::run_query) are detached.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: Vec<(String, Value)>,
    index: HashMap<String, usize>,
    table: Option<Table>,
}

impl Row {
    /// An empty detached row.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attached(table: Table) -> Self {
        Self {
            table: Some(table),
            ..Self::default()
        }
    }

    pub(crate) fn from_record(table: Option<Table>, record: Record) -> Self {
        let mut index = HashMap::with_capacity(record.len());
        for (i, (name, _)) in record.iter().enumerate() {
            index.entry(name.to_ascii_lowercase()).or_insert(i);
        }
        Self {
            values: record,
            index,
            table,
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.index
            .get(&column.to_ascii_lowercase())
            .map(|&i| &self.values[i].1)
    }

    /// Set a column's value, returning the previous one.
    ///
    /// On an attached row the column must exist in the table and is stored
    /// under its schema spelling.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let name = match &self.table {
            Some(table) => table
                .column(column)
                .map(|c| c.name().to_string())
                .ok_or_else(|| CobraError::unknown_column(table.name(), column))?,
            None => column.to_string(),
        };

        let value = value.into();
        let key = name.to_ascii_lowercase();
        match self.index.get(&key) {
            Some(&i) => Ok(Some(std::mem::replace(&mut self.values[i].1, value))),
            None => {
                self.index.insert(key, self.values.len());
                self.values.push((name, value));
                Ok(None)
            }
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let i = self.index.remove(&column.to_ascii_lowercase())?;
        let (_, value) = self.values.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(&column.to_ascii_lowercase())
    }

    pub fn contains_all<I>(&self, columns: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        columns.into_iter().all(|c| self.contains(c.as_ref()))
    }

    /// Whether the row holds a non-NULL value for its table's primary key.
    pub fn has_primary_key(&self) -> bool {
        self.table
            .as_ref()
            .and_then(Table::primary_key)
            .and_then(|pk| self.get(pk.name()).map(|v| !v.is_null()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Columns and values in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Write this row's values back to its table, matched by primary key.
    pub fn persist(&self) -> Result<Completion<u64>> {
        self.owner()?.persist_row(self)
    }

    /// Delete the rows equal to this one from its table.
    pub fn delete(&self) -> Result<Completion<u64>> {
        self.owner()?.delete_row(self)
    }

    fn owner(&self) -> Result<&Table> {
        self.table
            .as_ref()
            .ok_or_else(|| CobraError::InvalidRow("row is not attached to a table".into()))
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        let same_table = match (&self.table, &other.table) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        same_table && self.values == other.values
    }
}
