//! RIPS document generation.
//!
//! Two strategies produce the same document shape:
//!
//! - [`interpreter`] walks the schema with a stored mapping configuration,
//!   fetching rows through the [`source`] collaborators.
//! - [`direct`] maps explicit patient/encounter selections through typed
//!   [`clinical`] records.
//!
//! [`GenerationService`] runs either one, allocates the sequence id and
//! validates the result.

pub mod clinical;
pub mod derive;
pub mod direct;
pub mod error;
pub mod interpreter;
pub mod join;
pub mod memory;
pub mod service;
pub mod source;

pub use clinical::{ClinicalSource, EmrTables};
pub use direct::{DirectPipeline, Selection};
pub use error::{GenerateError, Result, SourceError};
pub use interpreter::{Interpreter, InterpreterOptions};
pub use join::{
    ColumnNameJoin, DateFilter, DateRange, DeclaredJoins, GlobalParams, JoinKey, JoinStrategy,
};
pub use memory::{
    MemoryDataSource, MemoryMappingStore, MemoryReferenceTables, MemorySequence, MemoryTable,
};
pub use service::{GenerationOutput, GenerationService, output_filename};
pub use source::{
    AuditEntry, ColumnInfo, DataSource, MappingStore, Predicate, ReferenceLookup,
    ReferenceTableStore, RowSource, SchemaIntrospector, SequenceAllocator, SourceResult,
    StoredMapping, Strategy, YesNoRow,
};
