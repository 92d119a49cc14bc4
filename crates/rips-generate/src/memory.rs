//! In-memory collaborators.
//!
//! Used by the CLI when a dataset file is loaded and by tests as the mocked
//! data source.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;

use rips_model::{Row, value_to_string};

use crate::error::SourceError;
use crate::source::{
    AuditEntry, ColumnInfo, MappingStore, Predicate, ReferenceLookup, ReferenceTableStore,
    RowSource, SchemaIntrospector, SequenceAllocator, SourceResult, StoredMapping, YesNoRow,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    /// A table whose columns are inferred from its rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            columns: infer_columns(&rows),
            rows,
        }
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }
}

/// Tables held in memory, answering introspection, fetches and lookups.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    tables: BTreeMap<String, MemoryTable>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.insert_table(name, MemoryTable::from_rows(rows));
        self
    }

    pub fn insert_table(&mut self, name: &str, table: MemoryTable) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn require(&self, name: &str) -> SourceResult<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| SourceError::UnknownTable(name.to_string()))
    }
}

impl SchemaIntrospector for MemoryDataSource {
    fn columns_of(&self, table: &str) -> SourceResult<Vec<ColumnInfo>> {
        Ok(self.require(table)?.columns.clone())
    }
}

impl RowSource for MemoryDataSource {
    fn fetch_rows(&self, table: &str, predicates: &[Predicate]) -> SourceResult<Vec<Row>> {
        let data = self.require(table)?;
        for predicate in predicates {
            if !data.has_column(predicate.column()) {
                return Err(SourceError::UnknownColumn {
                    table: table.to_string(),
                    column: predicate.column().to_string(),
                });
            }
        }
        let rows: Vec<Row> = data
            .rows
            .iter()
            .filter(|row| predicates.iter().all(|p| p.matches(row)))
            .cloned()
            .collect();
        debug!(table, predicates = predicates.len(), rows = rows.len(), "fetched rows");
        Ok(rows)
    }
}

impl ReferenceLookup for MemoryDataSource {
    fn find_one(&self, table: &str, column: &str, value: &str) -> SourceResult<Option<Row>> {
        let data = self.require(table)?;
        Ok(data
            .rows
            .iter()
            .find(|row| row.get(column).and_then(value_to_string).as_deref() == Some(value))
            .cloned())
    }
}

/// Column list in first-seen order, typed from the first non-null value.
pub fn infer_columns(rows: &[Row]) -> Vec<ColumnInfo> {
    let mut columns: Vec<ColumnInfo> = Vec::new();
    for row in rows {
        for (name, value) in row {
            match columns.iter_mut().find(|c| &c.name == name) {
                Some(column) if column.data_type.is_empty() => {
                    column.data_type = type_name(value).to_string();
                }
                Some(_) => {}
                None => columns.push(ColumnInfo::new(name.clone(), type_name(value))),
            }
        }
    }
    columns
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "real",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) | Value::Object(_) => "json",
    }
}

#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    mappings: Mutex<BTreeMap<u64, StoredMapping>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for MemoryMappingStore {
    fn get(&self, id: u64) -> SourceResult<Option<StoredMapping>> {
        let mappings = self.mappings.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(mappings.get(&id).cloned())
    }

    fn list(&self) -> SourceResult<Vec<StoredMapping>> {
        let mappings = self.mappings.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(mappings.values().cloned().collect())
    }

    fn create(&self, name: &str, mapping: &str) -> SourceResult<StoredMapping> {
        let mut mappings = self.mappings.lock().unwrap_or_else(PoisonError::into_inner);
        let id = mappings.keys().next_back().map_or(1, |last| last + 1);
        let stored = StoredMapping {
            id,
            name: name.to_string(),
            mapping: mapping.to_string(),
        };
        mappings.insert(id, stored.clone());
        Ok(stored)
    }

    fn update(&self, id: u64, name: &str, mapping: &str) -> SourceResult<Option<StoredMapping>> {
        let mut mappings = self.mappings.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(mappings.get_mut(&id).map(|stored| {
            stored.name = name.to_string();
            stored.mapping = mapping.to_string();
            stored.clone()
        }))
    }

    fn delete(&self, id: u64) -> SourceResult<bool> {
        let mut mappings = self.mappings.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(mappings.remove(&id).is_some())
    }
}

/// Counter-backed sequence; entries are kept for inspection.
#[derive(Debug, Default)]
pub struct MemorySequence {
    last: AtomicU64,
    entries: Mutex<Vec<(u64, AuditEntry)>>,
}

impl MemorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(u64, AuditEntry)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SequenceAllocator for MemorySequence {
    fn allocate(&self, entry: &AuditEntry) -> SourceResult<u64> {
        let id = self.last.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, entry.clone()));
        Ok(id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryReferenceTables {
    yes_no: Mutex<Vec<YesNoRow>>,
}

impl MemoryReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceTableStore for MemoryReferenceTables {
    fn yes_no_rows(&self) -> SourceResult<Vec<YesNoRow>> {
        Ok(self
            .yes_no
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn insert_yes_no_rows(&self, rows: &[YesNoRow]) -> SourceResult<()> {
        self.yes_no
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(rows);
        Ok(())
    }
}
