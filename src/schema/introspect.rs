//! Offline schema introspection for SQLite databases.
//!
//! Walks `sqlite_master`, reads each table's columns with
//! `PRAGMA table_info`, and samples distinct values from text-like columns.
//! The result feeds `schema_gen`, which writes it out as `schema_index.json`.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use super::{ColumnInfo, SchemaIndex, SchemaResult, TableInfo};
use crate::sql::dialect::{Dialect, SqlDialect};

/// Sample and metadata queries are rendered for SQLite.
const DIALECT: Dialect = Dialect::Sqlite;

/// Declared-type fragments that mark a column as text-like.
const TEXT_TYPE_MARKERS: &[&str] = &["CHAR", "TEXT", "CLOB", "STRING"];

/// Whether a declared column type holds free text worth sampling.
pub fn is_text_like(declared_type: &str) -> bool {
    let upper = declared_type.to_ascii_uppercase();
    TEXT_TYPE_MARKERS.iter().any(|m| upper.contains(m))
}

/// Introspect the database file at `path`, opened read-only.
pub fn introspect_path<P: AsRef<Path>>(path: P, max_samples: usize) -> SchemaResult<SchemaIndex> {
    let conn = Connection::open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    introspect(&conn, max_samples)
}

/// Build a schema index from an open connection.
pub fn introspect(conn: &Connection, max_samples: usize) -> SchemaResult<SchemaIndex> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = table_columns(conn, &name)?;
        let mut table = TableInfo::new(&name, columns);

        for column in table.columns.clone() {
            if !is_text_like(&column.declared_type) {
                continue;
            }
            let samples = sample_column(conn, &name, &column.name, max_samples)?;
            debug!(table = %name, column = %column.name, count = samples.len(), "sampled column");
            table = table.with_samples(&column.name, samples);
        }

        tables.push(table);
    }

    info!(tables = tables.len(), "introspected sqlite schema");
    SchemaIndex::with_max_samples(tables, max_samples)
}

fn table_columns(conn: &Connection, table: &str) -> SchemaResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", DIALECT.quote_identifier(table)))?;
    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: Option<String> = row.get(2)?;
            Ok(ColumnInfo::new(name, declared.unwrap_or_default()))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn sample_column(
    conn: &Connection,
    table: &str,
    column: &str,
    max_samples: usize,
) -> SchemaResult<Vec<String>> {
    let col = DIALECT.quote_identifier(column);
    let mut sql = format!(
        "SELECT DISTINCT {col} FROM {} WHERE {col} IS NOT NULL",
        DIALECT.quote_identifier(table)
    );
    if max_samples > 0 {
        sql.push(' ');
        sql.push_str(&DIALECT.emit_row_limit(max_samples as u64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map([], |row| row.get::<_, SqlValue>(0))?
        .filter_map(|v| match v {
            Ok(SqlValue::Text(s)) => Some(Ok(s)),
            Ok(SqlValue::Integer(i)) => Some(Ok(i.to_string())),
            Ok(SqlValue::Real(f)) => Some(Ok(f.to_string())),
            Ok(SqlValue::Null) | Ok(SqlValue::Blob(_)) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}
