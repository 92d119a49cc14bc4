//! Error types for generation.
//!
//! Only preconditions and collaborator failures outside the interpreter walk
//! surface here. Failures inside the walk are logged and degrade the node.

use thiserror::Error;

use rips_model::ModelError;

/// A failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("{0}")]
    Backend(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("mapping {id} not found")]
    MappingNotFound { id: u64 },
    #[error("mapping {id} is malformed: {source}")]
    MalformedMapping {
        id: u64,
        #[source]
        source: ModelError,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("generation failed for selections [{selections}]: {message}")]
    SelectionFailed { selections: String, message: String },
    #[error("could not allocate a sequence id: {0}")]
    Sequence(#[source] SourceError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
