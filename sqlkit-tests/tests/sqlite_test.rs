//! Integration tests for sqlkit against SQLite
//!
//! Every test opens its own in-memory database through the process-wide
//! registry, so they run in parallel without a container.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlkit::{named_args, Error, Executor, Handle, Query, Record, Value};

const SCHEMA: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'active',
    age INTEGER
);

CREATE TABLE orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) DEFERRABLE INITIALLY DEFERRED,
    amount REAL NOT NULL
);
"#;

async fn open_db() -> Handle {
    sqlkit::register_default_drivers();
    let handle = sqlkit::open("sqlite://:memory:").unwrap();
    for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        handle.exec(stmt.trim(), vec![]).await.unwrap();
    }
    handle
}

async fn insert_users(handle: &Handle, n: usize) {
    for i in 1..=n {
        let status = if i % 2 == 0 { "active" } else { "inactive" };
        handle
            .exec(
                "INSERT INTO users (username, status, age) VALUES (?, ?, ?)",
                vec![format!("user{}", i).into(), status.into(), (20 + i as i64).into()],
            )
            .await
            .unwrap();
    }
}

// ============ Count Tests ============

#[tokio::test]
async fn test_count_matches_row_count() {
    let handle = open_db().await;
    insert_users(&handle, 7).await;

    let queries = [
        "SELECT * FROM users",
        "SELECT id, username FROM users WHERE age > 22",
        "SELECT * FROM users ORDER BY age DESC",
        "select username from users where status = 'active' order by id",
    ];
    for sql in queries {
        let rows = handle.query_rows(sql, vec![]).await.unwrap();
        let count = handle.count(sql, vec![]).await.unwrap();
        assert_eq!(count, rows.len() as i64, "count mismatch for {}", sql);
    }
}

#[tokio::test]
async fn test_count_with_limit_and_group_by() {
    let handle = open_db().await;
    insert_users(&handle, 10).await;

    let limited = "SELECT * FROM users ORDER BY id LIMIT 3";
    assert_eq!(handle.count(limited, vec![]).await.unwrap(), 3);

    let paged = "SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?";
    assert_eq!(
        handle.count(paged, vec![4.into(), 8.into()]).await.unwrap(),
        2
    );

    let grouped = "SELECT status, COUNT(*) AS n FROM users GROUP BY status";
    assert_eq!(handle.count(grouped, vec![]).await.unwrap(), 2);
}

#[tokio::test]
async fn test_count_with_positional_args() {
    let handle = open_db().await;
    insert_users(&handle, 6).await;

    let sql = "SELECT * FROM users WHERE status = ? ORDER BY id";
    assert_eq!(handle.count(sql, vec!["active".into()]).await.unwrap(), 3);
}

// ============ Row Tests ============

#[tokio::test]
async fn test_query_row_returns_first_row() {
    let handle = open_db().await;
    insert_users(&handle, 3).await;

    let row = handle
        .query_row("SELECT username FROM users ORDER BY id DESC", vec![])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<String>("username").unwrap(), "user3");

    let none = handle
        .query_row("SELECT * FROM users WHERE id = ?", vec![99.into()])
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_query_row_with_existing_limit() {
    let handle = open_db().await;
    insert_users(&handle, 3).await;

    // The limit clause is stripped and the first row of the full result comes back
    let row = handle
        .query_row("SELECT id FROM users ORDER BY id LIMIT 2, 1", vec![])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<i64>("id").unwrap(), 1);
}

#[tokio::test]
async fn test_query_row_with_placeholder_limit() {
    let handle = open_db().await;
    insert_users(&handle, 4).await;

    // Values bound to the stripped limit are dropped along with it
    let row = handle
        .query_row(
            "SELECT id FROM users WHERE id > ? ORDER BY id LIMIT ?",
            vec![0.into(), 2.into()],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<i64>("id").unwrap(), 1);

    let row = handle
        .query_row(
            "SELECT username FROM users WHERE status = ? ORDER BY id LIMIT ? OFFSET ?",
            vec!["active".into(), 1.into(), 1.into()],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<String>("username").unwrap(), "user2");
}

#[tokio::test]
async fn test_typed_record_access() {
    let handle = open_db().await;
    handle
        .exec(
            "INSERT INTO users (username, age) VALUES (?, ?)",
            vec!["nobody".into(), Value::Null],
        )
        .await
        .unwrap();

    let row = handle
        .query_row("SELECT * FROM users", vec![])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<Option<i32>>("age").unwrap(), None);
    assert_eq!(row.get::<String>("status").unwrap(), "active");
    assert!(matches!(
        row.get::<String>("missing"),
        Err(Error::ColumnNotFound(_))
    ));

    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["username"], "nobody");
}

// ============ Streaming Tests ============

#[tokio::test]
async fn test_streaming_visits_every_row() {
    let handle = open_db().await;
    insert_users(&handle, 200).await;

    let mut seen = Vec::new();
    handle
        .query_rows_streaming("SELECT id FROM users ORDER BY id", vec![], |record: Record| {
            seen.push(record.get::<i64>("id")?);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen.len(), 200);
    assert_eq!(seen.first(), Some(&1));
    assert_eq!(seen.last(), Some(&200));
}

#[tokio::test]
async fn test_streaming_callback_error_stops_iteration() {
    let handle = open_db().await;
    insert_users(&handle, 200).await;

    let mut seen = 0;
    let err = handle
        .query_rows_streaming("SELECT id FROM users ORDER BY id", vec![], |_| {
            seen += 1;
            if seen == 5 {
                return Err(Error::Query("stop".into()));
            }
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Query(ref m) if m == "stop"));
    assert_eq!(seen, 5);

    // The handle is usable afterwards
    assert_eq!(handle.count("SELECT * FROM users", vec![]).await.unwrap(), 200);
}

// ============ Named Parameter Tests ============

#[tokio::test]
async fn test_named_binding_end_to_end() {
    let handle = open_db().await;
    insert_users(&handle, 8).await;

    let args = named_args! { "status" => "active", "min_age" => 23 };
    let bound = handle
        .parse_named_sql(
            "SELECT * FROM users WHERE status = @status AND age >= @min_age ORDER BY id",
            Some(&args),
        )
        .unwrap();
    assert_eq!(
        bound.sql,
        "SELECT * FROM users WHERE status = ? AND age >= ? ORDER BY id"
    );

    let rows = handle.query_rows(&bound.sql, bound.values.clone()).await.unwrap();
    let count = handle.count(&bound.sql, bound.values).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_named_binding_missing_parameter() {
    let handle = open_db().await;

    let err = Query::new("SELECT * FROM users WHERE username = @name AND status = @status")
        .arg("name", "user1")
        .fetch_all(&handle)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingParameter(ref token) if token == "@status"));
}

#[tokio::test]
async fn test_query_builder_against_handle() {
    let handle = open_db().await;
    insert_users(&handle, 4).await;

    let res = Query::new("UPDATE users SET status = @status WHERE age > @age")
        .arg("status", "retired")
        .arg("age", 22)
        .execute(&handle)
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 2);

    let retired = Query::new("SELECT * FROM users WHERE status = ? ORDER BY id")
        .bind("retired")
        .count(&handle)
        .await
        .unwrap();
    assert_eq!(retired, 2);
}

// ============ Transaction Tests ============

#[tokio::test]
async fn test_transaction_commit() {
    let handle = open_db().await;

    let user_id = handle
        .transaction(|tx| {
            Box::pin(async move {
                let res = tx
                    .exec("INSERT INTO users (username) VALUES (?)", vec!["buyer".into()])
                    .await?;
                let user_id = res.last_insert_id.unwrap_or_default();
                tx.exec(
                    "INSERT INTO orders (user_id, amount) VALUES (?, ?)",
                    vec![user_id.into(), 19.99.into()],
                )
                .await?;
                assert_eq!(tx.count("SELECT * FROM orders", vec![]).await?, 1);
                Ok(user_id)
            })
        })
        .await
        .unwrap();

    assert!(user_id > 0);
    assert_eq!(handle.count("SELECT * FROM orders", vec![]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_transaction_rollback_on_error() {
    let handle = open_db().await;

    let err = handle
        .transaction(|tx| {
            Box::pin(async move {
                tx.exec("INSERT INTO users (username) VALUES (?)", vec!["ghost".into()])
                    .await?;
                Err::<(), _>(Error::Query("business rule failed".into()))
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Query(ref m) if m == "business rule failed"));
    assert_eq!(handle.count("SELECT * FROM users", vec![]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_transaction_rollback_on_commit_failure() {
    let handle = open_db().await;
    insert_users(&handle, 1).await;

    // The foreign key is deferred, so the bad order only fails at COMMIT
    let err = handle
        .transaction(|tx| {
            Box::pin(async move {
                tx.exec(
                    "INSERT INTO users (username) VALUES (?)",
                    vec!["doomed".into()],
                )
                .await?;
                tx.exec(
                    "INSERT INTO orders (user_id, amount) VALUES (?, ?)",
                    vec![404.into(), 1.0.into()],
                )
                .await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Sqlite(_)), "unexpected error: {:?}", err);
    assert_eq!(handle.count("SELECT * FROM users", vec![]).await.unwrap(), 1);
    assert_eq!(handle.count("SELECT * FROM orders", vec![]).await.unwrap(), 0);

    // No transaction is left open on the connection
    handle
        .transaction(|tx| Box::pin(async move { tx.count("SELECT * FROM users", vec![]).await }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transaction_streaming_and_row() {
    let handle = open_db().await;
    insert_users(&handle, 5).await;

    let names = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&names);
    let first = handle
        .transaction(move |tx| {
            Box::pin(async move {
                tx.query_rows_streaming("SELECT username FROM users ORDER BY id", vec![], |r| {
                    sink.lock().unwrap().push(r.get::<String>("username")?);
                    Ok(())
                })
                .await?;
                tx.query_row("SELECT username FROM users ORDER BY id", vec![])
                    .await
            })
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(names.lock().unwrap().len(), 5);
    assert_eq!(first.get::<String>("username").unwrap(), "user1");
}

async fn active_count<E: Executor>(db: &E) -> sqlkit::Result<i64> {
    Query::new("SELECT * FROM users WHERE status = @status")
        .arg("status", "active")
        .count(db)
        .await
}

#[tokio::test]
async fn test_executor_is_shared_by_handle_and_transaction() {
    let handle = open_db().await;
    insert_users(&handle, 4).await;

    assert_eq!(active_count(&handle).await.unwrap(), 2);
    let inside = handle
        .transaction(|tx| Box::pin(async move { active_count(tx).await }))
        .await
        .unwrap();
    assert_eq!(inside, 2);
}

#[tokio::test]
async fn test_cancelled_transaction_rolls_back() {
    let handle = open_db().await;

    let cancelled = tokio::time::timeout(
        Duration::from_millis(200),
        handle.transaction(|tx| {
            Box::pin(async move {
                tx.exec("INSERT INTO users (username) VALUES (?)", vec!["stuck".into()])
                    .await?;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
        }),
    )
    .await;
    assert!(cancelled.is_err());

    // The next transaction starts cleanly and the abandoned insert is gone
    handle
        .transaction(|tx| {
            Box::pin(async move {
                tx.exec("INSERT INTO users (username) VALUES (?)", vec!["next".into()])
                    .await?;
                Ok(())
            })
        })
        .await
        .unwrap();
    let rows = handle
        .query_rows("SELECT username FROM users", vec![])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<String>("username").unwrap(), "next");
}

// ============ Lifecycle Tests ============

#[tokio::test]
async fn test_close_then_not_open() {
    let handle = open_db().await;
    handle.close().await.unwrap();
    handle.close().await.unwrap();

    assert!(matches!(
        handle.query_rows("SELECT 1", vec![]).await,
        Err(Error::NotOpen)
    ));
    assert!(matches!(
        handle.count("SELECT * FROM users", vec![]).await,
        Err(Error::NotOpen)
    ));
    // Pure rewriting still works on a closed handle
    assert!(handle.parse_named_sql("SELECT @a", None).is_ok());
}

#[tokio::test]
async fn test_backend_closed_through_raw_is_not_open() {
    let handle = open_db().await;

    let raw = handle.get_raw().await.unwrap();
    raw.close().await.unwrap();

    let err = handle.count("SELECT * FROM users", vec![]).await.unwrap_err();
    assert!(matches!(err, Error::NotOpen));
}

#[tokio::test]
async fn test_get_raw_exposes_backend() {
    let handle = open_db().await;
    let raw = handle.get_raw().await.unwrap();
    assert_eq!(raw.driver_name(), "sqlite");
    assert!(raw
        .as_any()
        .downcast_ref::<sqlkit::SqliteBackend>()
        .is_some());
}

#[tokio::test]
async fn test_file_database_persists() {
    sqlkit::register_default_drivers();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let url = format!("sqlite://{}", path.display());

    let handle = sqlkit::open(&url).unwrap();
    handle
        .exec("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)", vec![])
        .await
        .unwrap();
    handle
        .exec("INSERT INTO kv VALUES (?, ?)", vec!["a".into(), "1".into()])
        .await
        .unwrap();
    handle.close().await.unwrap();

    let reopened = sqlkit::open(&url).unwrap();
    let row = reopened
        .query_row("SELECT v FROM kv WHERE k = ?", vec!["a".into()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<i64>("v").unwrap(), 1);
}

#[test]
fn test_unknown_and_invalid_connection_strings() {
    sqlkit::register_default_drivers();
    assert!(matches!(
        sqlkit::open("postgres://localhost/db"),
        Err(Error::UnknownDriver(ref s)) if s == "postgres"
    ));
    assert!(matches!(
        sqlkit::open("not a url"),
        Err(Error::InvalidConnectionString(_))
    ));
}
