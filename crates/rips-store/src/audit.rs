//! Append-only audit log that doubles as the sequence allocator.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rips_generate::{AuditEntry, SequenceAllocator, SourceResult};

use crate::error::{Result, StoreError};

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: u64,
    #[serde(flatten)]
    pub entry: AuditEntry,
}

/// JSON Lines log at a single path. Each allocation appends one record whose
/// id is the previous id plus one.
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    /// Last allocated id, read from disk on first use.
    last: Mutex<Option<u64>>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the log, in file order. Unparseable lines are skipped.
    pub fn records(&self) -> Result<Vec<AuditRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("open", &self.path, e)),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::io("read", &self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(error) => warn!(line = index + 1, %error, "skipping malformed audit record"),
            }
        }
        Ok(records)
    }

    fn append(&self, record: &AuditRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("create directory for", parent, e))?;
        }
        let mut line =
            serde_json::to_vec(record).map_err(|source| StoreError::Serialization {
                path: self.path.clone(),
                source,
            })?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io("open", &self.path, e))?;
        file.write_all(&line)
            .map_err(|e| StoreError::io("append to", &self.path, e))?;
        file.sync_all()
            .map_err(|e| StoreError::io("sync", &self.path, e))
    }
}

impl SequenceAllocator for FileAuditLog {
    fn allocate(&self, entry: &AuditEntry) -> SourceResult<u64> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = match *last {
            Some(id) => id,
            None => self.records()?.iter().map(|r| r.id).max().unwrap_or(0),
        };

        let record = AuditRecord {
            id: previous + 1,
            entry: entry.clone(),
        };
        self.append(&record)?;
        *last = Some(record.id);
        info!(id = record.id, strategy = entry.strategy.as_str(), "allocated document id");
        Ok(record.id)
    }
}
