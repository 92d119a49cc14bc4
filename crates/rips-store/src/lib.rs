//! File-backed collaborators for RIPS generation.
//!
//! Mappings, the audit log and reference tables live under one store
//! directory ([`RipsStore`]). Generated documents are written next to a
//! findings file by [`write_output`].

mod audit;
mod dataset;
pub mod error;
mod io;
mod mappings;
mod output;
mod reference;
mod store;

pub use audit::{AuditRecord, FileAuditLog};
pub use dataset::load_dataset;
pub use error::{Result, StoreError};
pub use io::{read_json, write_atomic, write_json};
pub use mappings::FileMappingStore;
pub use output::{OutputPaths, findings_filename, write_output};
pub use reference::FileReferenceTables;
pub use store::RipsStore;
