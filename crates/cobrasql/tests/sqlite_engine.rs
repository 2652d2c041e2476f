//! End-to-end tests against SQLite database files.

#![cfg(feature = "sqlite")]

mod common;

use cobrasql::{CobraError, ColumnDef, Engine, Row, SqlType, Value};
use common::{handler, init_tracing, text, users_columns};
use tempfile::TempDir;

fn engine() -> (TempDir, Engine) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::sqlite(dir.path().join("test.db")).unwrap();
    (dir, engine)
}

fn city_columns() -> Vec<ColumnDef> {
    let mut columns = users_columns();
    columns.push(
        ColumnDef::builder("city", SqlType::VarChar)
            .precision(40)
            .build()
            .unwrap(),
    );
    columns
}

// =============================================================================
// Table round trips
// =============================================================================

#[tokio::test]
async fn test_insert_then_fetch_by_key() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    assert_eq!(users.insert(["Alice"]).unwrap().await.unwrap(), 1);

    let (on_complete, rx) = handler::<Vec<Row>>();
    users.fetch_by_key(1i64, on_complete).unwrap();
    let rows = rx.await.unwrap().unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(text(&rows[0], "name"), "Alice");
    assert_eq!(rows[0].get("id").and_then(Value::as_i64), Some(1));
    assert!(rows[0].table().unwrap().ptr_eq(&users));
}

#[tokio::test]
async fn test_created_table_matches_introspection() {
    let (dir, engine) = engine();
    let mut columns = users_columns();
    columns.extend([
        ColumnDef::builder("balance", SqlType::Decimal)
            .precision(8)
            .scale(2)
            .build()
            .unwrap(),
        ColumnDef::builder("visits", SqlType::BigInt)
            .unsigned()
            .not_null()
            .build()
            .unwrap(),
        ColumnDef::builder("active", SqlType::Boolean).build().unwrap(),
        ColumnDef::builder("seen_at", SqlType::Timestamp)
            .precision(3)
            .build()
            .unwrap(),
    ]);
    let created = engine.create_table("accounts", columns).await.unwrap();

    // A second engine has an empty registry, so it must read the catalog.
    let other = Engine::sqlite(dir.path().join("test.db")).unwrap();
    let introspected = other.get_table("ACCOUNTS").await.unwrap().unwrap();

    assert_eq!(introspected.name(), "accounts");
    let expected: Vec<ColumnDef> = created.columns().iter().cloned().collect();
    let actual: Vec<ColumnDef> = introspected.columns().iter().cloned().collect();
    assert_eq!(actual, expected);
    assert!(introspected.primary_key().unwrap().is_autoincrement());
}

#[tokio::test]
async fn test_plain_integer_key_is_not_autoincrement() {
    let (dir, engine) = engine();
    let created = engine
        .create_table(
            "hits",
            [
                ColumnDef::builder("id", SqlType::Integer)
                    .primary()
                    .build()
                    .unwrap(),
                ColumnDef::builder("autoincrement_hint", SqlType::Integer)
                    .build()
                    .unwrap(),
            ],
        )
        .await
        .unwrap();
    assert!(!created.primary_key().unwrap().is_autoincrement());

    let other = Engine::sqlite(dir.path().join("test.db")).unwrap();
    let hits = other.get_table("hits").await.unwrap().unwrap();
    let expected: Vec<ColumnDef> = created.columns().iter().cloned().collect();
    let actual: Vec<ColumnDef> = hits.columns().iter().cloned().collect();
    assert_eq!(actual, expected);

    // The key is caller-supplied, so inserts carry both values.
    assert_eq!(
        hits.insert([Value::from(7i64), Value::from(3i64)])
            .unwrap()
            .await
            .unwrap(),
        1
    );
    let rows = other.run_query("SELECT id FROM hits").await.unwrap();
    assert_eq!(rows[0].get("id").and_then(Value::as_i64), Some(7));
    other.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queued_writes_see_earlier_writes() {
    let (_dir, engine) = engine();
    let items = engine
        .create_table(
            "items",
            [
                ColumnDef::builder("id", SqlType::Integer)
                    .primary()
                    .build()
                    .unwrap(),
                ColumnDef::builder("label", SqlType::VarChar).build().unwrap(),
            ],
        )
        .await
        .unwrap();

    let insert = items.insert([Value::I64(5), Value::from("draft")]).unwrap();

    let mut row = items.new_row();
    row.set("id", 5i64).unwrap();
    row.set("label", "final").unwrap();
    let update = row.persist().unwrap();

    assert_eq!(insert.await.unwrap(), 1);
    assert_eq!(update.await.unwrap(), 1);

    let (on_complete, rx) = handler::<Vec<Value>>();
    items.fetch_values("label", "id", 5i64, on_complete).unwrap();
    assert_eq!(rx.await.unwrap().unwrap(), vec![Value::from("final")]);
}

#[tokio::test]
async fn test_delete_by_value_removes_every_match() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", city_columns()).await.unwrap();
    for (name, city) in [("Alice", "London"), ("Bob", "London"), ("Carol", "Paris")] {
        users.insert([name, city]).unwrap().await.unwrap();
    }

    assert_eq!(users.delete("city", "London").unwrap().await.unwrap(), 2);

    let rows = engine.run_query("SELECT name FROM users").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(text(&rows[0], "name"), "Carol");
    assert!(rows[0].table().is_none());
}

#[tokio::test]
async fn test_update_matches_by_old_value() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", city_columns()).await.unwrap();
    users.insert(["Alice", "Lyon"]).unwrap().await.unwrap();
    users.insert(["Bob", "Lyon"]).unwrap().await.unwrap();
    users.insert(["Carol", "Nice"]).unwrap().await.unwrap();

    assert_eq!(
        users.update("city", "Lyon", "Paris").unwrap().await.unwrap(),
        2
    );

    let (on_complete, rx) = handler::<Vec<Row>>();
    users.fetch_where("city", "Paris", on_complete).unwrap();
    let mut names: Vec<String> = rx
        .await
        .unwrap()
        .unwrap()
        .iter()
        .map(|row| text(row, "name"))
        .collect();
    names.sort();
    assert_eq!(names, ["Alice", "Bob"]);
}

#[tokio::test]
async fn test_fetched_rows_write_back() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", city_columns()).await.unwrap();
    users.insert(["Alice", "Rome"]).unwrap().await.unwrap();
    users.insert([Value::from("Bob"), Value::Null]).unwrap().await.unwrap();

    let (on_complete, rx) = handler::<Vec<Row>>();
    users.fetch_where("city", Value::Null, on_complete).unwrap();
    let mut rows = rx.await.unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    let mut bob = rows.remove(0);
    assert!(bob.has_primary_key());

    assert!(matches!(
        bob.set("email", "bob@example.com"),
        Err(CobraError::UnknownColumn { .. })
    ));
    bob.set("CITY", "Oslo").unwrap();
    assert_eq!(bob.persist().unwrap().await.unwrap(), 1);

    let rows = engine
        .query_async("SELECT city FROM users WHERE name = 'Bob'")
        .unwrap()
        .await
        .unwrap();
    assert_eq!(text(&rows[0], "city"), "Oslo");

    assert_eq!(bob.delete().unwrap().await.unwrap(), 1);
    let rows = engine.run_query("SELECT id FROM users").await.unwrap();
    assert_eq!(rows.len(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failed_statement_reaches_caller() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    let err = users.insert([Value::Null]).unwrap().await.unwrap_err();
    assert!(matches!(err, CobraError::Statement { .. }));

    let (on_complete, rx) = handler::<Vec<Row>>();
    engine
        .run_async_query("SELECT * FROM missing", on_complete)
        .unwrap();
    assert!(matches!(
        rx.await.unwrap(),
        Err(CobraError::Statement { .. })
    ));

    // The queue keeps going after failures.
    assert_eq!(users.insert(["Alice"]).unwrap().await.unwrap(), 1);
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_worker() {
    let (_dir, engine) = engine();
    engine
        .run_async_query("SELECT 1", |_| panic!("handler failure"))
        .unwrap();

    let rows = engine.query_async("SELECT 1 AS one").unwrap().await.unwrap();
    assert_eq!(rows[0].get("one").and_then(Value::as_i64), Some(1));
}

#[tokio::test]
async fn test_statements_reject_unknown_columns() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    assert!(matches!(
        users.delete("email", "x"),
        Err(CobraError::UnknownColumn { .. })
    ));
    assert!(matches!(
        users.fetch_values("email", "id", 1i64, |_| {}),
        Err(CobraError::UnknownColumn { .. })
    ));
    assert!(matches!(
        users.insert(["Alice", "extra"]),
        Err(CobraError::ValueCount { .. })
    ));
}

// =============================================================================
// Registry
// =============================================================================

#[tokio::test]
async fn test_registry_returns_same_instance() {
    let (_dir, engine) = engine();
    let created = engine.create_table("users", users_columns()).await.unwrap();

    let first = engine.get_table("users").await.unwrap().unwrap();
    let second = engine.get_table("USERS").await.unwrap().unwrap();
    assert!(first.ptr_eq(&created));
    assert!(second.ptr_eq(&created));

    let fresh = engine.introspect_table("users").await.unwrap().unwrap();
    assert!(!fresh.ptr_eq(&created));
    assert_eq!(engine.tables().len(), 1);
}

#[tokio::test]
async fn test_missing_table_is_none() {
    let (_dir, engine) = engine();
    assert!(engine.get_table("nowhere").await.unwrap().is_none());
    assert!(engine.cached_table("nowhere").is_none());
    assert!(matches!(
        engine.get_table("bad name").await,
        Err(CobraError::Config(_))
    ));
}

#[tokio::test]
async fn test_rename_and_drop_update_registry() {
    let (_dir, engine) = engine();
    let table = engine.create_table("drafts", users_columns()).await.unwrap();

    engine.rename_table("drafts", "posts").await.unwrap();
    assert!(engine.cached_table("drafts").is_none());
    assert!(engine.cached_table("posts").unwrap().ptr_eq(&table));
    assert_eq!(table.name(), "posts");
    assert_eq!(table.insert(["hello"]).unwrap().await.unwrap(), 1);

    engine.drop_table("posts").await.unwrap();
    assert!(engine.tables().is_empty());
    assert!(engine.get_table("posts").await.unwrap().is_none());
}

// =============================================================================
// Schema changes
// =============================================================================

#[tokio::test]
async fn test_add_and_drop_column() {
    let (dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    let email = ColumnDef::builder("email", SqlType::VarChar)
        .precision(100)
        .build()
        .unwrap();
    users.add_column(email.clone()).await.unwrap();
    assert_eq!(users.column("email"), Some(email.clone()));
    assert_eq!(users.insert(["Alice", "a@example.com"]).unwrap().await.unwrap(), 1);

    let other = Engine::sqlite(dir.path().join("test.db")).unwrap();
    let seen = other.get_table("users").await.unwrap().unwrap();
    assert_eq!(seen.column("email"), Some(email));

    users.drop_column("EMAIL").await.unwrap();
    assert!(users.column("email").is_none());
    assert!(matches!(
        users.drop_column("email").await,
        Err(CobraError::UnknownColumn { .. })
    ));
}

#[tokio::test]
async fn test_modify_column_unsupported_on_sqlite() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    let wider = ColumnDef::builder("name", SqlType::VarChar)
        .precision(200)
        .not_null()
        .build()
        .unwrap();
    assert!(matches!(
        users.modify_column(wider).await,
        Err(CobraError::Unsupported { .. })
    ));
    assert_eq!(users.column("name").unwrap().precision(), 50);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_shutdown_drains_then_refuses() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    let pending: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| users.insert([name]).unwrap())
        .collect();
    engine.shutdown().await.unwrap();

    for insert in pending {
        assert_eq!(insert.await.unwrap(), 1);
    }
    assert!(matches!(users.insert(["d"]), Err(CobraError::EngineClosed)));
    assert!(matches!(
        engine.query_async("SELECT 1"),
        Err(CobraError::EngineClosed)
    ));
}

#[tokio::test]
async fn test_dropping_engine_drains_queue() {
    let (_dir, engine) = engine();
    let users = engine.create_table("users", users_columns()).await.unwrap();

    let insert = users.insert(["Alice"]).unwrap();
    drop(engine);

    assert_eq!(insert.await.unwrap(), 1);
    assert!(matches!(users.engine(), Err(CobraError::EngineClosed)));
}
