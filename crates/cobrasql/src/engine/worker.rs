//! Serialized statement worker.
//!
//! One worker task per engine owns the receiving end of an unbounded FIFO
//! channel and runs each command to completion before taking the next, so
//! queued statements execute strictly in submission order and never
//! concurrently with each other.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::executor::Executor;
use crate::error::Result;
use crate::row::Row;
use crate::table::Table;

/// Completion handler for a queued query.
pub(crate) type QueryHandler = Box<dyn FnOnce(Result<Vec<Row>>) + Send + 'static>;

/// Commands sent to the worker.
pub(crate) enum Command {
    /// Execute a statement and report the affected row count.
    Update {
        sql: String,
        reply: oneshot::Sender<Result<u64>>,
    },
    /// Execute a query; rows are attached to `table` when given.
    Query {
        sql: String,
        table: Option<Table>,
        on_complete: QueryHandler,
    },
    /// Graceful shutdown after everything queued before it.
    Shutdown,
}

/// Spawn the worker on `runtime`.
///
/// Returns a tuple of:
/// - `JoinHandle<()>`: Handle to the worker task
/// - `UnboundedSender<Command>`: Channel sender for commands
pub(crate) fn spawn(
    runtime: &Handle,
    executor: Arc<Executor>,
) -> (JoinHandle<()>, mpsc::UnboundedSender<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = runtime.spawn(run(executor, rx));
    (handle, tx)
}

async fn run(executor: Arc<Executor>, mut rx: mpsc::UnboundedReceiver<Command>) {
    tracing::info!("Engine worker started");

    loop {
        match rx.recv().await {
            Some(cmd) => {
                if handle_command(&executor, cmd).await {
                    break; // Shutdown requested
                }
            }
            None => {
                tracing::debug!("All engine handles dropped, shutting down");
                break;
            }
        }
    }

    executor.close().await;
    tracing::info!("Engine worker stopped");
}

/// Run one command. Returns true on shutdown.
async fn handle_command(executor: &Executor, cmd: Command) -> bool {
    match cmd {
        Command::Update { sql, reply } => {
            let result = executor.run_update(&sql).await;
            // The submitter may have dropped its Completion; the statement still ran.
            let _ = reply.send(result);
        }
        Command::Query {
            sql,
            table,
            on_complete,
        } => {
            let columns = table.as_ref().map(Table::columns);
            let result = executor
                .run_query(&sql, columns.as_ref())
                .await
                .map(|records| {
                    records
                        .into_iter()
                        .map(|record| Row::from_record(table.clone(), record))
                        .collect()
                });
            complete(on_complete, result);
        }
        Command::Shutdown => {
            tracing::info!("Shutdown requested");
            return true;
        }
    }
    false
}

/// Invoke a completion handler; a panicking handler is logged and the worker carries on.
fn complete(on_complete: QueryHandler, result: Result<Vec<Row>>) {
    if panic::catch_unwind(AssertUnwindSafe(move || on_complete(result))).is_err() {
        tracing::error!("Query completion handler panicked");
    }
}
