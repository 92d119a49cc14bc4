//! Reference tables kept as JSON files.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use rips_generate::{ReferenceTableStore, SourceResult, YesNoRow};

use crate::io::{read_json, write_json};

#[derive(Debug)]
pub struct FileReferenceTables {
    yes_no_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileReferenceTables {
    /// Tables stored under `dir`; files are created on first insert.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            yes_no_path: dir.as_ref().join("yes_no.json"),
            write_lock: Mutex::new(()),
        }
    }
}

impl ReferenceTableStore for FileReferenceTables {
    fn yes_no_rows(&self) -> SourceResult<Vec<YesNoRow>> {
        Ok(read_json(&self.yes_no_path)?.unwrap_or_default())
    }

    fn insert_yes_no_rows(&self, rows: &[YesNoRow]) -> SourceResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<YesNoRow> = read_json(&self.yes_no_path)?.unwrap_or_default();
        all.extend_from_slice(rows);
        write_json(&self.yes_no_path, &all)?;
        info!(rows = rows.len(), "Saved yes/no table to {}", self.yes_no_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rips_generate::source::default_yes_no_rows;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn empty_until_seeded_then_persisted() {
        let dir = tempdir().unwrap();
        let tables = FileReferenceTables::new(dir.path().join("reference"));
        assert!(tables.yes_no_rows().unwrap().is_empty());

        tables.insert_yes_no_rows(&default_yes_no_rows()).unwrap();

        let reopened = FileReferenceTables::new(dir.path().join("reference"));
        let rows = reopened.yes_no_rows().unwrap();
        assert_eq!(rows, default_yes_no_rows());
    }
}
