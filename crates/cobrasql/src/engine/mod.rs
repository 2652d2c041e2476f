//! Engine: one database, one connection, one serialized statement queue.
//!
//! An [`Engine`] owns:
//!
//! - the connection slot (`executor`), opened lazily and probed before reuse
//! - a worker task (`worker`) running queued statements strictly in FIFO order
//! - the registry of resolved [`Table`]s, keyed by lower-cased name
//!
//! Two call styles share the same connection:
//!
//! - `run_update` / `run_query` execute immediately on the calling task. They
//!   are not ordered against the queue.
//! - `run_async_update` / `run_async_query` / `query_async` enqueue; their
//!   outcome is delivered through a [`Completion`] or a completion handler.
//!
//! Both styles report failures as a typed [`Result`]; a failed statement has
//! already been rolled back when its error is observed.

mod completion;
mod executor;
mod worker;

pub use completion::Completion;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{Config, MysqlConfig};
use crate::core::{validate_identifier, ColumnDef, ColumnSet};
use crate::dialect::{Dialect, DialectImpl};
use crate::error::{CobraError, Result};
use crate::row::Row;
use crate::table::Table;
use executor::Executor;
use worker::{Command, QueryHandler};

/// Connection lifecycle as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No open connection (initial state, after a failed open, after shutdown).
    Disconnected,
    /// A connection is being opened.
    Connecting,
    /// A connection is open and passed its last liveness probe.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

// Guarded values are plain data that stay valid across a panic; poison is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct Queue {
    sender: UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

pub(crate) struct EngineInner {
    config: Config,
    dialect: DialectImpl,
    executor: Arc<Executor>,
    tables: RwLock<HashMap<String, Table>>,
    queue: Mutex<Option<Queue>>,
}

/// Handle to a database engine. Cheap to clone; clones share everything.
///
/// The worker keeps running until [`Engine::shutdown`] is called or the last
/// handle is dropped. In both cases statements already queued still run before
/// the connection is closed.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create an engine from a validated configuration.
    ///
    /// No connection is opened yet. Must be called from within a Tokio
    /// runtime, which hosts the engine's worker task.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let runtime = Handle::try_current().map_err(|_| {
            CobraError::Config("an Engine must be created inside a Tokio runtime".into())
        })?;
        let dialect = DialectImpl::from_db_type(config.database.kind())?;

        let executor = Arc::new(Executor::new(
            config.database.clone(),
            config.engine.clone(),
        ));
        let (worker, sender) = worker::spawn(&runtime, Arc::clone(&executor));

        info!(database = dialect.name(), "Engine started");

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                dialect,
                executor,
                tables: RwLock::new(HashMap::new()),
                queue: Mutex::new(Some(Queue { sender, worker })),
            }),
        })
    }

    /// Engine for an SQLite file, created if missing.
    pub fn sqlite(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(Config::sqlite(path))
    }

    /// Engine for a MySQL server.
    pub fn mysql(mysql: MysqlConfig) -> Result<Self> {
        Self::new(Config::mysql(mysql))
    }

    pub(crate) fn from_inner(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<EngineInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn dialect(&self) -> &DialectImpl {
        &self.inner.dialect
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.executor.state()
    }

    /// Make sure a live connection is open, opening or replacing it if needed.
    pub async fn connect(&self) -> Result<()> {
        self.inner.executor.connection().await.map(|_| ())
    }

    // ===== Direct execution =====

    /// Execute a statement now, on the calling task, and return the affected
    /// row count.
    pub async fn run_update(&self, sql: &str) -> Result<u64> {
        self.inner.executor.run_update(sql).await
    }

    /// Execute a query now, on the calling task. Rows are detached from any table.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Row>> {
        let records = self.inner.executor.run_query(sql, None).await?;
        Ok(records
            .into_iter()
            .map(|record| Row::from_record(None, record))
            .collect())
    }

    // ===== Queued execution =====

    /// Queue a statement behind everything submitted before it.
    pub fn run_async_update(&self, sql: impl Into<String>) -> Result<Completion<u64>> {
        let (reply, completion) = Completion::channel();
        self.send(Command::Update {
            sql: sql.into(),
            reply,
        })?;
        Ok(completion)
    }

    /// Queue a query; `on_complete` is invoked exactly once, on the worker,
    /// with the rows or the failure.
    pub fn run_async_query<F>(&self, sql: impl Into<String>, on_complete: F) -> Result<()>
    where
        F: FnOnce(Result<Vec<Row>>) + Send + 'static,
    {
        self.submit_query(sql.into(), None, Box::new(on_complete))
    }

    /// Queue a query and await its rows through a [`Completion`].
    pub fn query_async(&self, sql: impl Into<String>) -> Result<Completion<Vec<Row>>> {
        let (reply, completion) = Completion::channel();
        self.submit_query(
            sql.into(),
            None,
            Box::new(move |result| {
                let _ = reply.send(result);
            }),
        )?;
        Ok(completion)
    }

    pub(crate) fn submit_query(
        &self,
        sql: String,
        table: Option<Table>,
        on_complete: QueryHandler,
    ) -> Result<()> {
        self.send(Command::Query {
            sql,
            table,
            on_complete,
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        match lock(&self.inner.queue).as_ref() {
            Some(queue) => queue
                .sender
                .send(command)
                .map_err(|_| CobraError::EngineClosed),
            None => Err(CobraError::EngineClosed),
        }
    }

    // ===== Table registry =====

    /// Create a table and register it.
    ///
    /// The CREATE TABLE statement goes through the queue; the table is
    /// registered only after it succeeded.
    pub async fn create_table(
        &self,
        name: &str,
        columns: impl IntoIterator<Item = ColumnDef>,
    ) -> Result<Table> {
        validate_identifier(name)?;
        let columns =
            ColumnSet::from_columns(columns, self.inner.config.engine.primary_key_policy)?;
        if columns.is_empty() {
            return Err(CobraError::Config(format!(
                "Table {} needs at least one column",
                name
            )));
        }

        let sql = self.inner.dialect.create_table(name, &columns);
        self.run_async_update(sql)?.await?;

        let table = Table::new(name, columns, self.downgrade());
        write_lock(&self.inner.tables).insert(name.to_ascii_lowercase(), table.clone());
        info!(table = %name, "Created table");
        Ok(table)
    }

    /// Resolve a table by name (case-insensitive).
    ///
    /// Returns the registered instance if there is one; otherwise reads the
    /// table's columns from the database and registers the result. `Ok(None)`
    /// if no such table exists.
    pub async fn get_table(&self, name: &str) -> Result<Option<Table>> {
        validate_identifier(name)?;
        if let Some(table) = self.cached_table(name) {
            return Ok(Some(table));
        }

        let Some(table) = self.introspect_table(name).await? else {
            return Ok(None);
        };

        // Another task may have resolved the same table in the meantime.
        let mut tables = write_lock(&self.inner.tables);
        let registered = tables
            .entry(table.name().to_ascii_lowercase())
            .or_insert(table);
        Ok(Some(registered.clone()))
    }

    /// Read a table's definition from the database, bypassing and leaving
    /// untouched the registry.
    pub async fn introspect_table(&self, name: &str) -> Result<Option<Table>> {
        validate_identifier(name)?;
        let Some(schema) = self.inner.executor.introspect(name).await? else {
            debug!(table = %name, "Table not found");
            return Ok(None);
        };

        let columns = ColumnSet::from_columns(
            schema.columns,
            self.inner.config.engine.primary_key_policy,
        )?;
        debug!(table = %schema.name, columns = columns.len(), "Introspected table");
        Ok(Some(Table::new(schema.name, columns, self.downgrade())))
    }

    /// The registered table of that name, if any. Never touches the database.
    pub fn cached_table(&self, name: &str) -> Option<Table> {
        read_lock(&self.inner.tables)
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    /// All registered tables, ordered by name.
    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = read_lock(&self.inner.tables).values().cloned().collect();
        tables.sort_by_key(|t| t.name());
        tables
    }

    /// Rename a table in the database, then in the registry. Handles to the
    /// table see the new name.
    pub async fn rename_table(&self, from: &str, to: &str) -> Result<()> {
        validate_identifier(from)?;
        validate_identifier(to)?;

        let sql = self.inner.dialect.rename_table(from, to);
        self.run_async_update(sql)?.await?;

        let mut tables = write_lock(&self.inner.tables);
        if let Some(table) = tables.remove(&from.to_ascii_lowercase()) {
            table.set_name(to);
            tables.insert(to.to_ascii_lowercase(), table);
        }
        info!(from = %from, to = %to, "Renamed table");
        Ok(())
    }

    /// Drop a table in the database, then forget it.
    pub async fn drop_table(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;

        let sql = self.inner.dialect.drop_table(name);
        self.run_async_update(sql)?.await?;

        write_lock(&self.inner.tables).remove(&name.to_ascii_lowercase());
        info!(table = %name, "Dropped table");
        Ok(())
    }

    // ===== Lifecycle =====

    /// Stop accepting work, let queued statements finish, close the connection.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let queue = lock(&self.inner.queue).take();
        let Some(Queue { sender, worker }) = queue else {
            return Ok(());
        };

        // Queued behind everything already submitted.
        let _ = sender.send(Command::Shutdown);
        drop(sender);

        worker
            .await
            .map_err(|e| CobraError::Internal(format!("Engine worker failed: {}", e)))?;
        info!("Engine stopped");
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.inner.config.database.kind())
            .field("state", &self.state())
            .field("tables", &read_lock(&self.inner.tables).len())
            .finish()
    }
}
