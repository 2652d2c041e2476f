//! Shared helpers for integration tests.

#![allow(dead_code)]

use cobrasql::{ColumnDef, Row, SqlType};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. Set `RUST_LOG=cobrasql=debug` to see statements.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `users(id INTEGER PRIMARY KEY AUTOINCREMENT UNSIGNED, name VARCHAR(50) NOT NULL)`
pub fn users_columns() -> Vec<ColumnDef> {
    vec![
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
    ]
}

/// A completion handler plus the receiver it reports to.
pub fn handler<T: Send + 'static>() -> (
    impl FnOnce(cobrasql::Result<T>) + Send + 'static,
    oneshot::Receiver<cobrasql::Result<T>>,
) {
    let (tx, rx) = oneshot::channel();
    (
        move |result| {
            let _ = tx.send(result);
        },
        rx,
    )
}

/// Text of a column, panicking if absent or not text.
pub fn text(row: &Row, column: &str) -> String {
    row.get(column)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("{} is not text in {:?}", column, row))
        .to_string()
}
