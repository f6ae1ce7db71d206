//! Tests for sanitising, read-only enforcement and dialect rewrites.

use heron::sql::rewrite::{apply_row_limit, ensure_read_only, rewrite_nulls_ordering};
use heron::sql::{prepare, Dialect, UnsafeQueryError};
use rusqlite::Connection;

// ============================================================================
// Read-only Enforcement
// ============================================================================

#[test]
fn test_writes_are_rejected() {
    for sql in [
        "DELETE FROM Site",
        "UPDATE Site SET Name = 'x'",
        "INSERT INTO Site (Name) VALUES ('x')",
        "DROP TABLE Site",
        "EXEC sp_who",
        "",
    ] {
        assert_eq!(
            prepare(sql, 200, &Dialect::TSql),
            Err(UnsafeQueryError::NotSelect),
            "{sql:?} should be rejected"
        );
    }
}

#[test]
fn test_injected_second_statement_is_dropped() {
    assert_eq!(
        prepare("SELECT Name FROM Site; DROP TABLE Site", 200, &Dialect::TSql).unwrap(),
        "SELECT TOP 200 Name FROM Site"
    );
}

#[test]
fn test_apostrophe_in_comment_does_not_hide_second_statement() {
    let sql = "SELECT Name FROM Site -- it's the site list\n; DELETE FROM Site WHERE ((";
    assert_eq!(
        prepare(sql, 10, &Dialect::TSql).unwrap(),
        "SELECT TOP 10 Name FROM Site"
    );

    let sql = "SELECT Name /* Site's; names */ FROM Site; DELETE FROM Site";
    let prepared = prepare(sql, 10, &Dialect::TSql).unwrap();
    assert!(prepared.starts_with("SELECT TOP 10 Name"));
    assert!(!prepared.contains("DELETE"), "{prepared}");
}

#[test]
fn test_unterminated_literal_hiding_a_statement_is_rejected() {
    assert_eq!(
        prepare("SELECT 'x; DELETE FROM Site", 10, &Dialect::TSql),
        Err(UnsafeQueryError::MultipleStatements)
    );
}

#[test]
fn test_select_into_is_rejected() {
    assert!(matches!(
        prepare("SELECT * INTO SiteBackup FROM Site", 200, &Dialect::TSql),
        Err(UnsafeQueryError::Writes(_))
    ));
}

#[test]
fn test_row_locking_is_rejected() {
    assert!(matches!(
        ensure_read_only("SELECT * FROM Site FOR UPDATE", &Dialect::Postgres),
        Err(UnsafeQueryError::Writes(_))
    ));
}

#[test]
fn test_unparseable_select_is_left_to_the_server() {
    assert!(ensure_read_only("SELECT Name FROM Site WHERE ((", &Dialect::TSql).is_ok());
}

#[test]
fn test_echoed_dialogue_is_removed() {
    let sql = "SELECT Name FROM Site\nassistant: Here is the query.\nuser: thanks";
    assert_eq!(
        prepare(sql, 10, &Dialect::Postgres).unwrap(),
        "SELECT Name FROM Site LIMIT 10"
    );
}

// ============================================================================
// Row Limits: head modifier (T-SQL)
// ============================================================================

#[test]
fn test_top_after_select() {
    assert_eq!(
        prepare("SELECT Name FROM Site", 10, &Dialect::TSql).unwrap(),
        "SELECT TOP 10 Name FROM Site"
    );
}

#[test]
fn test_top_after_distinct() {
    assert_eq!(
        prepare("SELECT DISTINCT Name FROM Site", 5, &Dialect::TSql).unwrap(),
        "SELECT DISTINCT TOP 5 Name FROM Site"
    );
}

#[test]
fn test_existing_top_is_clamped() {
    assert_eq!(
        prepare("SELECT TOP 500 Name FROM Site", 200, &Dialect::TSql).unwrap(),
        "SELECT TOP 200 Name FROM Site"
    );
    assert_eq!(
        prepare("SELECT TOP (20) Name FROM Site", 200, &Dialect::TSql).unwrap(),
        "SELECT TOP 20 Name FROM Site"
    );
}

#[test]
fn test_top_percent_is_wrapped() {
    assert_eq!(
        apply_row_limit("SELECT TOP 10 PERCENT Name FROM Site", 200, &Dialect::TSql),
        "SELECT TOP 200 * FROM (SELECT TOP 10 PERCENT Name FROM Site) AS _sub"
    );
}

#[test]
fn test_non_bare_select_is_wrapped() {
    assert_eq!(
        apply_row_limit("(SELECT Name FROM Site) UNION (SELECT Name FROM Zone)", 50, &Dialect::TSql),
        "SELECT TOP 50 * FROM ((SELECT Name FROM Site) UNION (SELECT Name FROM Zone)) AS _sub"
    );
}

// ============================================================================
// Row Limits: trailing clause
// ============================================================================

#[test]
fn test_limit_appended() {
    assert_eq!(
        prepare("SELECT Name FROM Site ORDER BY Name", 200, &Dialect::Postgres).unwrap(),
        "SELECT Name FROM Site ORDER BY Name LIMIT 200"
    );
}

#[test]
fn test_existing_limit_is_clamped() {
    assert_eq!(
        prepare("SELECT Name FROM Site LIMIT 500", 200, &Dialect::Sqlite).unwrap(),
        "SELECT Name FROM Site LIMIT 200"
    );
    assert_eq!(
        prepare("SELECT Name FROM Site LIMIT 3", 200, &Dialect::DuckDb).unwrap(),
        "SELECT Name FROM Site LIMIT 3"
    );
}

#[test]
fn test_limit_with_offset_is_wrapped() {
    assert_eq!(
        prepare("SELECT Name FROM Site LIMIT 5 OFFSET 10", 200, &Dialect::MySql).unwrap(),
        "SELECT * FROM (SELECT Name FROM Site LIMIT 5 OFFSET 10) AS _sub LIMIT 200"
    );
}

#[test]
fn test_trailing_comment_does_not_swallow_limit() {
    assert_eq!(
        prepare("SELECT Name FROM Site -- all sites", 10, &Dialect::Sqlite).unwrap(),
        "SELECT Name FROM Site LIMIT 10"
    );
    assert_eq!(
        prepare("SELECT Name FROM Site LIMIT 5 OFFSET 10 -- page three", 200, &Dialect::MySql).unwrap(),
        "SELECT * FROM (SELECT Name FROM Site LIMIT 5 OFFSET 10) AS _sub LIMIT 200"
    );
}

#[test]
fn test_fetch_next_for_ansi() {
    assert_eq!(
        prepare("SELECT Name FROM Site", 25, &Dialect::Ansi).unwrap(),
        "SELECT Name FROM Site OFFSET 0 ROWS FETCH NEXT 25 ROWS ONLY"
    );
}

// ============================================================================
// NULLS FIRST / LAST
// ============================================================================

#[test]
fn test_nulls_kept_where_supported() {
    assert_eq!(
        prepare("SELECT Name FROM Site ORDER BY ZoneId DESC NULLS LAST", 10, &Dialect::Postgres).unwrap(),
        "SELECT Name FROM Site ORDER BY ZoneId DESC NULLS LAST LIMIT 10"
    );
}

#[test]
fn test_nulls_rewritten_for_tsql() {
    assert_eq!(
        prepare("SELECT Name FROM Site ORDER BY ZoneId DESC NULLS LAST", 10, &Dialect::TSql).unwrap(),
        "SELECT TOP 10 Name FROM Site ORDER BY CASE WHEN ZoneId IS NULL THEN 0 ELSE 1 END DESC, ZoneId DESC"
    );
}

#[test]
fn test_nulls_rewrite_without_direction() {
    assert_eq!(
        rewrite_nulls_ordering("SELECT * FROM t ORDER BY s.Name NULLS FIRST"),
        "SELECT * FROM t ORDER BY CASE WHEN s.Name IS NULL THEN 0 ELSE 1 END, s.Name"
    );
}

#[test]
fn test_nulls_rewrite_multiple_keys() {
    let sql = "SELECT * FROM t ORDER BY a ASC NULLS LAST, b DESC NULLS FIRST";
    assert_eq!(
        rewrite_nulls_ordering(sql),
        "SELECT * FROM t ORDER BY CASE WHEN a IS NULL THEN 1 ELSE 0 END ASC, a ASC, \
         CASE WHEN b IS NULL THEN 1 ELSE 0 END DESC, b DESC"
    );
}

#[test]
fn test_nulls_rewrite_function_key() {
    assert_eq!(
        rewrite_nulls_ordering("SELECT * FROM t ORDER BY COALESCE(a, b) DESC NULLS LAST"),
        "SELECT * FROM t ORDER BY CASE WHEN COALESCE(a, b) IS NULL THEN 0 ELSE 1 END DESC, \
         COALESCE(a, b) DESC"
    );
}

#[test]
fn test_nulls_rewrite_leaves_partial_expressions_alone() {
    let sql = "SELECT * FROM t ORDER BY a + 1 DESC NULLS LAST";
    assert_eq!(rewrite_nulls_ordering(sql), sql);
}

/// The rewritten ordering must produce the same row order as the native
/// modifier, for every direction and placement.
#[test]
fn test_nulls_rewrite_matches_native_ordering() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER);
         INSERT INTO t (id, v) VALUES (1, 3), (2, NULL), (3, 1), (4, NULL), (5, 2);",
    )
    .unwrap();

    let ids = |sql: &str| -> Vec<i64> {
        let mut stmt = conn.prepare(sql).unwrap();
        let rows = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<i64>, _>>()
            .unwrap();
        rows
    };

    for ordering in [
        "v NULLS FIRST",
        "v NULLS LAST",
        "v ASC NULLS FIRST",
        "v ASC NULLS LAST",
        "v DESC NULLS FIRST",
        "v DESC NULLS LAST",
        "COALESCE(v, NULL) DESC NULLS LAST",
        "(v) NULLS FIRST",
    ] {
        let native = format!("SELECT id FROM t ORDER BY {ordering}, id");
        let rewritten = rewrite_nulls_ordering(&native).into_owned();
        assert_ne!(native, rewritten);
        assert_eq!(ids(&native), ids(&rewritten), "ordering {ordering:?}");
    }
}
