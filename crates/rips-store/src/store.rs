//! Directory layout of a store.
//!
//! ```text
//! <root>/mappings/<id>.json
//! <root>/audit.jsonl
//! <root>/reference/yes_no.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::audit::FileAuditLog;
use crate::error::{Result, StoreError};
use crate::mappings::FileMappingStore;
use crate::reference::FileReferenceTables;

/// File-backed collaborators sharing one root directory.
#[derive(Debug, Clone)]
pub struct RipsStore {
    root: PathBuf,
    mappings: Arc<FileMappingStore>,
    audit: Arc<FileAuditLog>,
    reference: Arc<FileReferenceTables>,
}

impl RipsStore {
    /// Open the store at `root`, creating its directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io("create directory", &root, e))?;
        let mappings = FileMappingStore::open(root.join("mappings"))?;
        debug!(root = %root.display(), "opened store");
        Ok(Self {
            mappings: Arc::new(mappings),
            audit: Arc::new(FileAuditLog::new(root.join("audit.jsonl"))),
            reference: Arc::new(FileReferenceTables::new(root.join("reference"))),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mappings(&self) -> Arc<FileMappingStore> {
        Arc::clone(&self.mappings)
    }

    pub fn audit(&self) -> Arc<FileAuditLog> {
        Arc::clone(&self.audit)
    }

    pub fn reference(&self) -> Arc<FileReferenceTables> {
        Arc::clone(&self.reference)
    }
}
