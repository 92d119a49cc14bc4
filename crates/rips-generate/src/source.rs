//! Collaborator contracts.
//!
//! Generation only talks to the outside world through these traits. Every
//! method is a single call; implementations decide how it maps onto their
//! storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rips_model::{Row, value_to_string};

use crate::error::SourceError;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// A column reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A filter clause for [`RowSource::fetch_rows`].
///
/// Values compare by their string form, so `1` and `"1"` are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Equals { column: String, value: Value },
    /// Inclusive on both ends; string comparison.
    Between {
        column: String,
        start: String,
        end: String,
    },
    In { column: String, values: Vec<Value> },
}

impl Predicate {
    pub fn equals(column: impl Into<String>, value: Value) -> Self {
        Self::Equals {
            column: column.into(),
            value,
        }
    }

    pub fn between(
        column: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self::Between {
            column: column.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn any_of(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            column: column.into(),
            values,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Equals { column, .. } | Self::Between { column, .. } | Self::In { column, .. } => {
                column
            }
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(self.column()).and_then(value_to_string) else {
            return false;
        };
        match self {
            Self::Equals { value, .. } => value_to_string(value).is_some_and(|v| v == actual),
            Self::Between { start, end, .. } => {
                actual.as_str() >= start.as_str() && actual.as_str() <= end.as_str()
            }
            Self::In { values, .. } => values
                .iter()
                .filter_map(value_to_string)
                .any(|v| v == actual),
        }
    }
}

pub trait SchemaIntrospector: Send + Sync {
    /// Columns of `table`, in declaration order.
    fn columns_of(&self, table: &str) -> SourceResult<Vec<ColumnInfo>>;
}

pub trait RowSource: Send + Sync {
    /// Rows of `table` matching every predicate, in source order.
    fn fetch_rows(&self, table: &str, predicates: &[Predicate]) -> SourceResult<Vec<Row>>;
}

pub trait ReferenceLookup: Send + Sync {
    /// First row of `table` whose `column` equals `value`.
    fn find_one(&self, table: &str, column: &str, value: &str) -> SourceResult<Option<Row>>;
}

/// Everything the interpreter needs from the external store.
pub trait DataSource: SchemaIntrospector + RowSource + ReferenceLookup {}

impl<T: SchemaIntrospector + RowSource + ReferenceLookup> DataSource for T {}

/// A persisted mapping configuration. `mapping` is the JSON-encoded
/// [`MappingConfig`](rips_model::MappingConfig).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMapping {
    pub id: u64,
    pub name: String,
    pub mapping: String,
}

pub trait MappingStore: Send + Sync {
    fn get(&self, id: u64) -> SourceResult<Option<StoredMapping>>;
    fn list(&self) -> SourceResult<Vec<StoredMapping>>;
    fn create(&self, name: &str, mapping: &str) -> SourceResult<StoredMapping>;
    /// `None` when no mapping has this id.
    fn update(&self, id: u64, name: &str, mapping: &str) -> SourceResult<Option<StoredMapping>>;
    /// `false` when no mapping has this id.
    fn delete(&self, id: u64) -> SourceResult<bool>;
}

/// Which strategy produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Mapping,
    Selection,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::Selection => "selection",
        }
    }
}

/// What is recorded alongside each generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub created_at: DateTime<Utc>,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<u64>,
    pub users: usize,
}

impl AuditEntry {
    pub fn new(strategy: Strategy, mapping_id: Option<u64>, users: usize) -> Self {
        Self {
            created_at: Utc::now(),
            strategy,
            mapping_id,
            users,
        }
    }
}

/// Single-writer, strictly increasing id allocation.
pub trait SequenceAllocator: Send + Sync {
    fn allocate(&self, entry: &AuditEntry) -> SourceResult<u64>;
}

/// One row of the yes/no reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YesNoRow {
    pub code: String,
    pub label: String,
    pub affirmative: bool,
}

impl YesNoRow {
    pub fn new(code: &str, label: &str, affirmative: bool) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
            affirmative,
        }
    }
}

/// Rows seeded into an empty yes/no table.
pub fn default_yes_no_rows() -> Vec<YesNoRow> {
    vec![YesNoRow::new("SI", "Si", true), YesNoRow::new("NO", "No", false)]
}

pub trait ReferenceTableStore: Send + Sync {
    fn yes_no_rows(&self) -> SourceResult<Vec<YesNoRow>>;
    fn insert_yes_no_rows(&self, rows: &[YesNoRow]) -> SourceResult<()>;
}
