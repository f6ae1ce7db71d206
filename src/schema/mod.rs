//! Schema index: the static catalog of tables, columns and sample values.
//!
//! The index is built offline (see [`introspect`] and the `schema_gen`
//! binary), loaded once at startup and never mutated afterwards. It is
//! shared by reference between the retriever and the snippet builder, so
//! concurrent questions can read it without locking.
//!
//! # File Format
//!
//! A JSON object keyed by table name. Table order in the file is the
//! iteration order of the index, which retrieval uses to break ties.
//!
//! ```json
//! {
//!   "Site": {
//!     "columns": [
//!       {"name": "Id", "type": "INTEGER"},
//!       {"name": "Name", "type": "varchar(200)", "sample_values": ["Surat", "Vapi"]}
//!     ],
//!     "sample_values": {"Name": ["Udhna"]}
//!   }
//! }
//! ```
//!
//! Samples may be given per column or per table; both are merged.

pub mod introspect;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default number of samples kept per column.
pub const DEFAULT_MAX_SAMPLES: usize = 5;

/// Errors raised while loading or building a schema index.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema index not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read schema index: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse schema index: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate table in schema index: {0}")]
    DuplicateTable(String),

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// A column and its declared type, as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Free-form declared type, e.g. `varchar(200)`.
    pub declared_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// Everything the index knows about one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Distinct non-null samples for text-like columns, keyed by column name.
    pub sample_values: HashMap<String, Vec<String>>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            columns,
            sample_values: HashMap::new(),
        }
    }

    /// Attach samples for a column (builder style).
    pub fn with_samples<I, S>(mut self, column: &str, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sample_values
            .entry(column.to_string())
            .or_default()
            .extend(samples.into_iter().map(Into::into));
        self
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Every sample value of every sampled column.
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.sample_values.values().flatten().map(String::as_str)
    }
}

/// Immutable catalog of tables in schema order.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    tables: Vec<TableInfo>,
    by_name: HashMap<String, usize>,
}

impl SchemaIndex {
    /// Build an index, validating names and normalising samples.
    pub fn new(tables: Vec<TableInfo>) -> SchemaResult<Self> {
        Self::with_max_samples(tables, DEFAULT_MAX_SAMPLES)
    }

    /// Like [`SchemaIndex::new`] with an explicit per-column sample cap (0 = no cap).
    pub fn with_max_samples(tables: Vec<TableInfo>, max_samples: usize) -> SchemaResult<Self> {
        let mut by_name = HashMap::with_capacity(tables.len());
        let mut normalized = Vec::with_capacity(tables.len());

        for (position, table) in tables.into_iter().enumerate() {
            if by_name.insert(table.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateTable(table.name));
            }
            normalized.push(normalize_table(table, max_samples)?);
        }

        Ok(Self {
            tables: normalized,
            by_name,
        })
    }

    /// Load an index from a JSON file. A missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P, max_samples: usize) -> SchemaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content, max_samples)
    }

    /// Parse an index from JSON text.
    pub fn from_json_str(json: &str, max_samples: usize) -> SchemaResult<Self> {
        let raw: RawIndex = serde_json::from_str(json)?;
        let tables = raw.0.into_iter().map(RawTable::into_table_info).collect();
        Self::with_max_samples(tables, max_samples)
    }

    /// Serialize to pretty JSON in the column-level sample format.
    pub fn to_json_string(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the index to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SchemaResult<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.by_name.get(name).map(|&idx| &self.tables[idx])
    }

    /// Column list of a table.
    pub fn describe_table(&self, name: &str) -> SchemaResult<&[ColumnInfo]> {
        self.table(name)
            .map(|t| t.columns.as_slice())
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// Tables in schema order.
    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// One-line summaries, `Table(col, col, ...)`.
    pub fn summary_lines(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| format!("{}({})", t.name, t.column_names().collect::<Vec<_>>().join(", ")))
            .collect()
    }
}

fn normalize_table(mut table: TableInfo, max_samples: usize) -> SchemaResult<TableInfo> {
    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
    }

    let samples = std::mem::take(&mut table.sample_values);
    for (column, values) in samples {
        if !table.has_column(&column) {
            warn!(table = %table.name, column = %column, "dropping samples for unknown column");
            continue;
        }
        let values = normalize_samples(values, max_samples);
        if !values.is_empty() {
            table.sample_values.insert(column, values);
        }
    }

    Ok(table)
}

/// Drop blanks and duplicates (first occurrence wins), then cap.
fn normalize_samples(values: Vec<String>, max_samples: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let cap = if max_samples == 0 { usize::MAX } else { max_samples };

    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.clone()))
        .take(cap)
        .collect()
}

// =============================================================================
// JSON Representation
// =============================================================================

/// Table entries in document order.
struct RawIndex(Vec<(String, RawTable)>);

impl<'de> Deserialize<'de> for RawIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IndexVisitor;

        impl<'de> Visitor<'de> for IndexVisitor {
            type Value = RawIndex;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of table name to table info")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut tables = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, table)) = map.next_entry::<String, RawTable>()? {
                    tables.push((name, table));
                }
                Ok(RawIndex(tables))
            }
        }

        deserializer.deserialize_map(IndexVisitor)
    }
}

#[derive(Deserialize)]
struct RawTable {
    #[serde(default)]
    columns: Vec<RawColumn>,
    #[serde(default)]
    sample_values: HashMap<String, Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawColumn {
    name: String,
    #[serde(rename = "type", alias = "declared_type", default)]
    declared_type: String,
    #[serde(default)]
    sample_values: Vec<serde_json::Value>,
}

impl RawTable {
    fn into_table_info(entry: (String, RawTable)) -> TableInfo {
        let (name, raw) = entry;
        let mut table = TableInfo::new(name, Vec::with_capacity(raw.columns.len()));

        for column in raw.columns {
            if !column.sample_values.is_empty() {
                table = table.with_samples(&column.name, scalars(column.sample_values));
            }
            table
                .columns
                .push(ColumnInfo::new(column.name, column.declared_type));
        }
        for (column, values) in raw.sample_values {
            table = table.with_samples(&column, scalars(values));
        }

        table
    }
}

/// Stringify scalar JSON samples; nulls and nested values are skipped.
fn scalars(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

#[derive(Serialize)]
struct SerTable<'a> {
    columns: Vec<SerColumn<'a>>,
}

#[derive(Serialize)]
struct SerColumn<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    declared_type: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    sample_values: &'a [String],
}

impl Serialize for SchemaIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            let columns = table
                .columns
                .iter()
                .map(|c| SerColumn {
                    name: &c.name,
                    declared_type: &c.declared_type,
                    sample_values: table
                        .sample_values
                        .get(&c.name)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]),
                })
                .collect();
            map.serialize_entry(&table.name, &SerTable { columns })?;
        }
        map.end()
    }
}
