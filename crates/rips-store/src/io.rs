//! Whole-file JSON reads and atomic writes.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// reader never sees a partially written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::io("create directory for", parent, e))?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let mut file =
            File::create(&temp_path).map_err(|e| StoreError::io("create", &temp_path, e))?;
        file.write_all(bytes)
            .map_err(|e| StoreError::io("write", &temp_path, e))?;
        file.sync_all()
            .map_err(|e| StoreError::io("sync", &temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|source| StoreError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` and write it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut json =
        serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialization {
            path: path.to_path_buf(),
            source,
        })?;
    json.push(b'\n');
    write_atomic(path, &json)
}

/// Read and parse `path`; `None` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io("read", path, e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Deserialization {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        write_json(&path, &json!({"a": 1})).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let value: Value = read_json(&path).unwrap().unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn overwrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        write_json(&path, &json!([1])).unwrap();
        write_json(&path, &json!([2, 3])).unwrap();
        let value: Value = read_json(&path).unwrap().unwrap();
        assert_eq!(value, json!([2, 3]));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let value: Option<Value> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn malformed_file_is_a_deserialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json::<Value>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Deserialization { .. }));
        assert!(err.suggestion().is_some());
    }
}
