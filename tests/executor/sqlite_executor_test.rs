//! Integration tests for the in-process SQLite executor.

use std::path::Path;
use std::time::Duration;

use heron::executor::{DatabaseError, QueryExecutor, SqliteExecutor, Value};
use heron::sql::{prepare, Dialect};
use rusqlite::Connection;
use tempfile::TempDir;

fn create_db(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("assets.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Zone (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL);
         CREATE TABLE Site (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL, ZoneId INTEGER, Elevation REAL);
         INSERT INTO Zone (Id, Name) VALUES (1, 'Western'), (2, 'Central');",
    )
    .unwrap();
    for i in 1..=50 {
        let zone: Option<i64> = if i % 10 == 0 { None } else { Some(1 + i % 2) };
        conn.execute(
            "INSERT INTO Site (Id, Name, ZoneId, Elevation) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![i, format!("Site {i}"), zone, i as f64 * 1.5],
        )
        .unwrap();
    }
    path
}

fn executor(path: &Path) -> SqliteExecutor {
    SqliteExecutor::open(path, Duration::from_secs(5), 2).unwrap()
}

#[tokio::test]
async fn test_select_returns_typed_rows() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&create_db(&dir));

    let result = exec
        .execute("SELECT Id, Name, ZoneId, Elevation FROM Site WHERE Id IN (1, 10) ORDER BY Id", 200)
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["Id", "Name", "ZoneId", "Elevation"]);
    assert_eq!(result.len(), 2);
    assert_eq!(result.get(0, "Name"), Some(&Value::Text("Site 1".into())));
    assert_eq!(result.get(0, "Elevation"), Some(&Value::Float(1.5)));
    assert_eq!(result.get(1, "ZoneId"), Some(&Value::Null));
}

#[tokio::test]
async fn test_rows_are_capped_at_limit() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&create_db(&dir));

    let result = exec.execute("SELECT * FROM Site", 10).await.unwrap();
    assert_eq!(result.len(), 10);

    let result = exec.execute("SELECT * FROM Site", 200).await.unwrap();
    assert_eq!(result.len(), 50);
}

#[tokio::test]
async fn test_prepared_statement_with_trailing_comment_is_bounded() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&create_db(&dir));

    let sql = prepare("SELECT Name FROM Site -- all sites", 10, &Dialect::Sqlite).unwrap();
    // Executor cap well above the row count, so only the statement bounds it.
    let result = exec.execute(&sql, 1000).await.unwrap();
    assert_eq!(result.len(), 10);
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&create_db(&dir));

    let result = exec.execute("SELECT Name FROM Site WHERE Id < 0", 200).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["Name"]);
}

#[tokio::test]
async fn test_writes_are_refused() {
    let dir = TempDir::new().unwrap();
    let path = create_db(&dir);
    let exec = executor(&path);

    for sql in ["DELETE FROM Site", "UPDATE Site SET Name = 'x'", "DROP TABLE Zone"] {
        let err = exec.execute(sql, 200).await.unwrap_err();
        assert!(
            matches!(err, DatabaseError::NotReadOnly | DatabaseError::Query(_)),
            "{sql}: {err:?}"
        );
    }

    let count: i64 = Connection::open(&path)
        .unwrap()
        .query_row("SELECT COUNT(*) FROM Site", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 50);
}

#[tokio::test]
async fn test_bad_sql_is_a_query_error() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&create_db(&dir));

    let err = exec.execute("SELECT Nme FROM Site", 200).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Query(_)));
}

#[tokio::test]
async fn test_missing_database_is_a_connection_error() {
    let dir = TempDir::new().unwrap();
    let result = SqliteExecutor::open(dir.path().join("missing.sqlite"), Duration::from_secs(1), 1);
    assert!(matches!(result, Err(DatabaseError::Connection(_))));
}

#[tokio::test]
async fn test_long_query_times_out() {
    let dir = TempDir::new().unwrap();
    let exec = SqliteExecutor::open(create_db(&dir), Duration::from_millis(200), 1).unwrap();

    let endless = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT COUNT(*) FROM c";
    let err = exec.execute(endless, 1).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Timeout(_)));

    // The executor stays usable after an interrupted statement.
    let result = exec.execute("SELECT COUNT(*) AS n FROM Zone", 1).await.unwrap();
    assert_eq!(result.get(0, "n"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn test_concurrent_queries_share_the_pool() {
    let dir = TempDir::new().unwrap();
    let exec = std::sync::Arc::new(executor(&create_db(&dir)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let exec = exec.clone();
            tokio::spawn(async move {
                exec.execute(&format!("SELECT Name FROM Site WHERE Id = {}", i + 1), 10)
                    .await
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert_eq!(result.get(0, "Name"), Some(&Value::Text(format!("Site {}", i + 1))));
    }
}

#[test]
fn test_dialect_defaults_to_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = create_db(&dir);
    assert_eq!(executor(&path).dialect(), Dialect::Sqlite);
    assert_eq!(executor(&path).with_dialect(Dialect::Ansi).dialect(), Dialect::Ansi);
}
