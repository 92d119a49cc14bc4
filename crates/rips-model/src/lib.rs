//! RIPS document model.
//!
//! - [`schema`]: the declarative document shape walked by the interpreter
//! - [`binding`]: how each schema node obtains its value
//! - [`context`]: row state accumulated during traversal
//! - [`document`]: the typed and JSON forms of a generated transaction
//! - [`finding`]: validation findings

pub mod binding;
pub mod context;
pub mod document;
pub mod error;
pub mod finding;
pub mod path;
pub mod schema;

pub use binding::{BindingSpec, BindingViolation, Derivation, MappingConfig, ViolationKind};
pub use context::{ContextMode, ExecutionContext, Row, value_to_string};
pub use document::{
    Consultation, Medication, Procedure, RipsDocument, Services, Transaction, User,
};
pub use error::{ModelError, Result};
pub use finding::{Severity, ValidationError, error_count, warning_count};
pub use path::SchemaPath;
pub use schema::{LeafKind, SchemaField, SchemaNode, rips_schema};
