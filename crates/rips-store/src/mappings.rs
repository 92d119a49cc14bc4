//! Mapping repository: one JSON file per stored mapping.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use rips_generate::{MappingStore, SourceResult, StoredMapping};

use crate::error::{Result, StoreError};
use crate::io::{read_json, write_json};

/// Stores each mapping as `<dir>/<id>.json`.
///
/// Ids are allocated as one more than the largest id on disk. Writes go
/// through a temp file and a rename.
#[derive(Debug)]
pub struct FileMappingStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMappingStore {
    /// Open the repository, creating the directory if it doesn't exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create directory", &dir, e))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Ids of every `<id>.json` file, ascending.
    fn ids(&self) -> Result<Vec<u64>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| StoreError::io("read directory", &self.dir, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("read directory", &self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<u64>) {
                Some(Ok(id)) => ids.push(id),
                _ => debug!(path = %path.display(), "skipping non-mapping file"),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn load(&self, id: u64) -> Result<Option<StoredMapping>> {
        let stored: Option<StoredMapping> = read_json(&self.path_for(id))?;
        Ok(stored.map(|mut stored| {
            // the file name is authoritative
            stored.id = id;
            stored
        }))
    }

    fn save(&self, stored: &StoredMapping) -> Result<()> {
        let path = self.path_for(stored.id);
        write_json(&path, stored)?;
        info!(id = stored.id, name = %stored.name, "Saved mapping to {}", path.display());
        Ok(())
    }
}

impl MappingStore for FileMappingStore {
    fn get(&self, id: u64) -> SourceResult<Option<StoredMapping>> {
        Ok(self.load(id)?)
    }

    fn list(&self) -> SourceResult<Vec<StoredMapping>> {
        let mut mappings = Vec::new();
        for id in self.ids()? {
            match self.load(id) {
                Ok(Some(stored)) => mappings.push(stored),
                Ok(None) => {}
                Err(err) => warn!(id, error = %err, "skipping unreadable mapping"),
            }
        }
        Ok(mappings)
    }

    fn create(&self, name: &str, mapping: &str) -> SourceResult<StoredMapping> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let id = self.ids()?.last().map_or(1, |last| last + 1);
        let stored = StoredMapping {
            id,
            name: name.to_string(),
            mapping: mapping.to_string(),
        };
        self.save(&stored)?;
        Ok(stored)
    }

    fn update(&self, id: u64, name: &str, mapping: &str) -> SourceResult<Option<StoredMapping>> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.load(id)?.is_none() {
            return Ok(None);
        }
        let stored = StoredMapping {
            id,
            name: name.to_string(),
            mapping: mapping.to_string(),
        };
        self.save(&stored)?;
        Ok(Some(stored))
    }

    fn delete(&self, id: u64) -> SourceResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| StoreError::io("delete", &path, e))?;
        info!(id, "Deleted mapping {}", path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn ids_follow_the_largest_on_disk() {
        let dir = tempdir().unwrap();
        let store = FileMappingStore::open(dir.path().join("mappings")).unwrap();

        assert_eq!(store.create("a", "{}").unwrap().id, 1);
        assert_eq!(store.create("b", "{}").unwrap().id, 2);
        assert!(store.delete(1).unwrap());
        assert_eq!(store.create("c", "{}").unwrap().id, 3);

        let names: Vec<_> = store.list().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn stray_files_are_ignored() {
        let dir = tempdir().unwrap();
        let store = FileMappingStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("draft.json"), "{}").unwrap();
        store.create("only", "{}").unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }
}
