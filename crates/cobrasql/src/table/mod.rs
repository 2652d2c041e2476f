//! Table handles.
//!
//! A [`Table`] is a named handle bound to one schema and one engine. It turns
//! record-level operations into SQL text ([`statement`]) and submits it to
//! the engine's queue, so operations on the tables of one engine run in the
//! order they were issued.
//!
//! A table does not keep its engine alive. Once every [`Engine`] handle is
//! gone, operations fail with [`CobraError::EngineClosed`].

mod statement;

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use tracing::info;

use crate::core::{ColumnDef, ColumnSet, Value};
use crate::dialect::{Dialect, DialectImpl};
use crate::engine::{read_lock, write_lock, Completion, Engine, EngineInner};
use crate::error::{CobraError, Result};
use crate::row::Row;

struct TableInner {
    name: RwLock<String>,
    columns: RwLock<ColumnSet>,
    engine: Weak<EngineInner>,
}

/// Handle to one table of an engine. Clones refer to the same table.
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    pub(crate) fn new(
        name: impl Into<String>,
        columns: ColumnSet,
        engine: Weak<EngineInner>,
    ) -> Self {
        Self {
            inner: Arc::new(TableInner {
                name: RwLock::new(name.into()),
                columns: RwLock::new(columns),
                engine,
            }),
        }
    }

    pub fn name(&self) -> String {
        read_lock(&self.inner.name).clone()
    }

    pub(crate) fn set_name(&self, name: &str) {
        *write_lock(&self.inner.name) = name.to_string();
    }

    /// Snapshot of the table's columns.
    pub fn columns(&self) -> ColumnSet {
        read_lock(&self.inner.columns).clone()
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<ColumnDef> {
        read_lock(&self.inner.columns).get(name).cloned()
    }

    pub fn primary_key(&self) -> Option<ColumnDef> {
        read_lock(&self.inner.columns).primary_key().cloned()
    }

    /// Whether both handles refer to the same table instance.
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The owning engine.
    pub fn engine(&self) -> Result<Engine> {
        self.inner
            .engine
            .upgrade()
            .map(Engine::from_inner)
            .ok_or(CobraError::EngineClosed)
    }

    /// An empty row attached to this table.
    pub fn new_row(&self) -> Row {
        Row::attached(self.clone())
    }

    // ===== Writes =====

    /// Insert one row. Values are matched in order against every column
    /// except a generated primary key.
    pub fn insert<I>(&self, values: I) -> Result<Completion<u64>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.submit_update(|d, name, columns| statement::insert(d, name, columns, &values))
    }

    /// Write every non-key column held by `row`, matched by its primary key value.
    pub fn persist_row(&self, row: &Row) -> Result<Completion<u64>> {
        self.submit_update(|d, name, columns| statement::update_row(d, name, columns, row))
    }

    /// Set `column` to `new` on every row where it equals `old`.
    pub fn update(
        &self,
        column: &str,
        old: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Result<Completion<u64>> {
        let (old, new) = (old.into(), new.into());
        self.submit_update(|d, name, columns| {
            statement::update_matching(d, name, columns, column, &old, &new)
        })
    }

    /// Delete every row equal to `row` on all the columns it holds.
    pub fn delete_row(&self, row: &Row) -> Result<Completion<u64>> {
        self.submit_update(|d, name, columns| statement::delete_row(d, name, columns, row))
    }

    /// Delete every row where `column` equals `value`.
    pub fn delete(&self, column: &str, value: impl Into<Value>) -> Result<Completion<u64>> {
        let value = value.into();
        self.submit_update(|d, name, columns| {
            statement::delete_matching(d, name, columns, column, &value)
        })
    }

    fn submit_update<F>(&self, build: F) -> Result<Completion<u64>>
    where
        F: FnOnce(&DialectImpl, &str, &ColumnSet) -> Result<String>,
    {
        let engine = self.engine()?;
        let sql = {
            let columns = read_lock(&self.inner.columns);
            build(engine.dialect(), &self.name(), &*columns)?
        };
        engine.run_async_update(sql)
    }

    // ===== Reads =====

    /// Queue `SELECT select FROM table WHERE where_column = where_value`.
    ///
    /// An empty `select` selects every column. `on_complete` runs once on
    /// the engine's worker; the rows it receives are attached to this table.
    pub fn fetch_rows<F>(
        &self,
        select: &[&str],
        where_column: &str,
        where_value: impl Into<Value>,
        on_complete: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Vec<Row>>) + Send + 'static,
    {
        let engine = self.engine()?;
        let where_value = where_value.into();
        let sql = {
            let columns = read_lock(&self.inner.columns);
            statement::select(
                engine.dialect(),
                &self.name(),
                &columns,
                select,
                where_column,
                &where_value,
            )?
        };
        engine.submit_query(sql, Some(self.clone()), Box::new(on_complete))
    }

    /// Every column of the rows where `where_column` equals `where_value`.
    pub fn fetch_where<F>(
        &self,
        where_column: &str,
        where_value: impl Into<Value>,
        on_complete: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Vec<Row>>) + Send + 'static,
    {
        self.fetch_rows(&[], where_column, where_value, on_complete)
    }

    /// The row whose primary key equals `key`.
    pub fn fetch_by_key<F>(&self, key: impl Into<Value>, on_complete: F) -> Result<()>
    where
        F: FnOnce(Result<Vec<Row>>) + Send + 'static,
    {
        let pk = self
            .primary_key()
            .ok_or_else(|| CobraError::NoPrimaryKey(self.name()))?;
        self.fetch_rows(&[], pk.name(), key, on_complete)
    }

    /// One column of the rows where `where_column` equals `where_value`.
    pub fn fetch_values<F>(
        &self,
        select_column: &str,
        where_column: &str,
        where_value: impl Into<Value>,
        on_complete: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Vec<Value>>) + Send + 'static,
    {
        let selected = self
            .column(select_column)
            .ok_or_else(|| CobraError::unknown_column(self.name(), select_column))?;
        let key = selected.name().to_string();

        self.fetch_rows(
            &[selected.name()],
            where_column,
            where_value,
            move |result| {
                on_complete(result.map(|rows| {
                    rows.into_iter()
                        .map(|row| row.get(&key).cloned().unwrap_or(Value::Null))
                        .collect()
                }))
            },
        )
    }

    // ===== Schema changes =====
    //
    // The in-memory schema changes only after the DDL succeeded.

    /// `ALTER TABLE ... ADD COLUMN`. Adding a column identical to an existing
    /// one does nothing.
    pub async fn add_column(&self, column: ColumnDef) -> Result<()> {
        let engine = self.engine()?;
        if !self.columns().add(column.clone())? {
            return Ok(());
        }

        let name = self.name();
        let sql = engine.dialect().add_column(&name, &column);
        engine.run_async_update(sql)?.await?;

        info!(table = %name, column = %column.name(), "Added column");
        write_lock(&self.inner.columns).add(column)?;
        Ok(())
    }

    /// `ALTER TABLE ... MODIFY COLUMN`, replacing the column of the same name.
    pub async fn modify_column(&self, column: ColumnDef) -> Result<()> {
        let engine = self.engine()?;
        let name = self.name();
        let mut staged = self.columns();
        if staged.replace(column.clone())?.is_none() {
            return Err(CobraError::unknown_column(name, column.name()));
        }

        let sql = engine.dialect().modify_column(&name, &column)?;
        engine.run_async_update(sql)?.await?;

        info!(table = %name, column = %column.name(), "Modified column");
        write_lock(&self.inner.columns).replace(column)?;
        Ok(())
    }

    /// `ALTER TABLE ... DROP COLUMN`.
    pub async fn drop_column(&self, column: &str) -> Result<()> {
        let engine = self.engine()?;
        let name = self.name();
        let existing = self
            .column(column)
            .ok_or_else(|| CobraError::unknown_column(&name, column))?;

        let sql = engine.dialect().drop_column(&name, existing.name());
        engine.run_async_update(sql)?.await?;

        write_lock(&self.inner.columns).remove(existing.name());
        info!(table = %name, column = %existing.name(), "Dropped column");
        Ok(())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("columns", &read_lock(&self.inner.columns).names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PrimaryKeyPolicy, SqlType};

    fn orphan() -> Table {
        let columns = ColumnSet::from_columns(
            [
                ColumnDef::builder("id", SqlType::Integer)
                    .primary()
                    .build()
                    .unwrap(),
                ColumnDef::builder("name", SqlType::VarChar).build().unwrap(),
            ],
            PrimaryKeyPolicy::default(),
        )
        .unwrap();
        Table::new("people", columns, Weak::new())
    }

    #[test]
    fn test_table_without_engine() {
        let table = orphan();
        assert!(matches!(table.engine(), Err(CobraError::EngineClosed)));
        assert!(matches!(
            table.insert([Value::I64(1), Value::from("Ann")]),
            Err(CobraError::EngineClosed)
        ));
        assert!(matches!(
            table.fetch_by_key(1i64, |_| {}),
            Err(CobraError::EngineClosed)
        ));
    }

    #[test]
    fn test_schema_accessors() {
        let table = orphan();
        assert_eq!(table.column("NAME").unwrap().name(), "name");
        assert_eq!(table.primary_key().unwrap().name(), "id");
        assert!(table.ptr_eq(&table.clone()));
        assert!(!table.ptr_eq(&orphan()));

        table.set_name("persons");
        assert_eq!(table.name(), "persons");
        assert_eq!(
            format!("{:?}", table),
            r#"Table { name: "persons", columns: ["id", "name"] }"#
        );
    }
}
