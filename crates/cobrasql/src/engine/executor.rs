//! The engine's single connection slot.
//!
//! All statement execution goes through [`Executor`], which holds at most one
//! open connection behind an async mutex. Before a connection is reused it
//! must pass a liveness probe bounded by the validation timeout; a missing or
//! dead connection is replaced by a fresh one bounded by the connect timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::{lock, ConnectionState};
use crate::config::{DatabaseConfig, EngineOptions};
use crate::core::ColumnSet;
use crate::drivers::{DbConnection, Record, TableSchema};
use crate::error::{CobraError, Result};

pub(crate) struct Executor {
    database: DatabaseConfig,
    options: EngineOptions,
    slot: AsyncMutex<Option<DbConnection>>,
    state: Mutex<ConnectionState>,
    closed: AtomicBool,
}

impl Executor {
    pub(crate) fn new(database: DatabaseConfig, options: EngineOptions) -> Self {
        Self {
            database,
            options,
            slot: AsyncMutex::new(None),
            state: Mutex::new(ConnectionState::Disconnected),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    /// Exclusive access to a live connection, opening or re-opening it as needed.
    pub(crate) async fn connection(&self) -> Result<MappedMutexGuard<'_, DbConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CobraError::EngineClosed);
        }

        let mut slot = self.slot.lock().await;
        // `close` may have emptied the slot while this call waited for it.
        if self.closed.load(Ordering::Acquire) {
            return Err(CobraError::EngineClosed);
        }

        if let Some(conn) = slot.as_mut() {
            match tokio::time::timeout(self.options.validation_timeout(), conn.ping()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "Connection failed liveness probe, reconnecting");
                    *slot = None;
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.options.validation_timeout_secs,
                        "Connection liveness probe timed out, reconnecting"
                    );
                    *slot = None;
                }
            }
        }

        if slot.is_none() {
            self.set_state(ConnectionState::Connecting);
            match DbConnection::open(&self.database, self.options.connect_timeout()).await {
                Ok(conn) => {
                    info!(database = conn.kind(), "Connection established");
                    *slot = Some(conn);
                    self.set_state(ConnectionState::Connected);
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    error!(error = %e, "Failed to open connection");
                    return Err(e);
                }
            }
        }

        MutexGuard::try_map(slot, |s| s.as_mut())
            .map_err(|_| CobraError::Internal("connection slot empty after open".into()))
    }

    pub(crate) async fn run_update(&self, sql: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        debug!(statement = %sql, "Executing update");
        let result = conn.execute(sql).await;
        if let Err(e) = &result {
            error!(error = %e, statement = %sql, "Update failed");
        }
        result
    }

    pub(crate) async fn run_query(
        &self,
        sql: &str,
        columns: Option<&ColumnSet>,
    ) -> Result<Vec<Record>> {
        let mut conn = self.connection().await?;
        debug!(statement = %sql, "Executing query");
        let result = conn.query(sql, columns).await;
        if let Err(e) = &result {
            error!(error = %e, statement = %sql, "Query failed");
        }
        result
    }

    pub(crate) async fn introspect(&self, table: &str) -> Result<Option<TableSchema>> {
        let mut conn = self.connection().await?;
        conn.introspect(table).await
    }

    /// Close the connection and refuse further work.
    pub(crate) async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut slot = self.slot.lock().await;
        if let Some(conn) = slot.take() {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Error while closing connection");
            }
            info!("Connection closed");
        }
        self.set_state(ConnectionState::Disconnected);
    }
}
