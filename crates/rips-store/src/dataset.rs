//! Loading a JSON dataset into an in-memory data source.
//!
//! The file maps table names to their rows, optionally with declared columns:
//!
//! ```json
//! { "tables": {
//!     "patient_data": { "columns": ["pid", {"name": "DOB", "type": "date"}], "rows": [...] },
//!     "billing": [ {"pid": 1, "code": "J00X"} ]
//! } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use rips_generate::memory::infer_columns;
use rips_generate::{ColumnInfo, MemoryDataSource, MemoryTable};
use rips_model::Row;

use crate::error::{Result, StoreError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetFile {
    tables: BTreeMap<String, TableSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableSpec {
    Rows(Vec<Row>),
    Declared {
        #[serde(default)]
        columns: Option<Vec<ColumnSpec>>,
        rows: Vec<Row>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Name(String),
    Info(ColumnInfo),
}

/// Read a dataset file into a [`MemoryDataSource`].
pub fn load_dataset(path: &Path) -> Result<MemoryDataSource> {
    let contents = fs::read_to_string(path).map_err(|e| StoreError::io("read", path, e))?;
    let file: DatasetFile =
        serde_json::from_str(&contents).map_err(|source| StoreError::Deserialization {
            path: path.to_path_buf(),
            source,
        })?;

    let mut source = MemoryDataSource::new();
    let mut total_rows = 0;
    for (name, spec) in file.tables {
        let table = build_table(&name, spec).map_err(|reason| StoreError::InvalidDataset {
            path: path.to_path_buf(),
            reason,
        })?;
        total_rows += table.rows.len();
        source.insert_table(&name, table);
    }

    info!(
        tables = source.table_names().count(),
        rows = total_rows,
        "Loaded dataset from {}",
        path.display()
    );
    Ok(source)
}

fn build_table(name: &str, spec: TableSpec) -> std::result::Result<MemoryTable, String> {
    let (declared, rows) = match spec {
        TableSpec::Rows(rows) | TableSpec::Declared {
            columns: None,
            rows,
        } => return Ok(MemoryTable::from_rows(rows)),
        TableSpec::Declared {
            columns: Some(columns),
            rows,
        } => (columns, rows),
    };

    let inferred = infer_columns(&rows);
    let columns: Vec<ColumnInfo> = declared
        .into_iter()
        .map(|spec| match spec {
            ColumnSpec::Info(info) => info,
            ColumnSpec::Name(column) => {
                let data_type = inferred
                    .iter()
                    .find(|c| c.name == column)
                    .map_or("text", |c| c.data_type.as_str());
                ColumnInfo::new(column.as_str(), data_type)
            }
        })
        .collect();

    for (index, row) in rows.iter().enumerate() {
        if let Some(column) = row.keys().find(|k| !columns.iter().any(|c| &c.name == *k)) {
            return Err(format!(
                "table {name} row {} has undeclared column {column}",
                index + 1
            ));
        }
    }
    Ok(MemoryTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use rips_generate::{Predicate, RowSource, SchemaIntrospector};
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn write(dir: &Path, value: &serde_json::Value) -> std::path::PathBuf {
        let path = dir.join("dataset.json");
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn bare_rows_and_declared_columns_both_load() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            &json!({"tables": {
                "billing": [{"pid": 1, "code": "J00X"}],
                "patient_data": {
                    "columns": ["pid", {"name": "DOB", "type": "date"}, "notes"],
                    "rows": [{"pid": 1, "DOB": "1980-05-10"}]
                }
            }}),
        );

        let source = load_dataset(&path).unwrap();
        let columns = source.columns_of("patient_data").unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["pid", "DOB", "notes"]);
        assert_eq!(columns[1].data_type, "date");
        assert_eq!(columns[2].data_type, "text");

        let rows = source
            .fetch_rows("billing", &[Predicate::equals("pid", json!(1))])
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn undeclared_row_column_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            &json!({"tables": {"t": {"columns": ["a"], "rows": [{"a": 1}, {"a": 2, "b": 3}]}}}),
        );
        let err = load_dataset(&path).unwrap_err();
        assert!(err.to_string().contains("row 2 has undeclared column b"), "{err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = load_dataset(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { operation: "read", .. }));
    }
}
