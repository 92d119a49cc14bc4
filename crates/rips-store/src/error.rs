//! Store error types.
//!
//! File operations return structured errors with a user-facing message and,
//! where one exists, a remediation hint.

use std::path::PathBuf;

use rips_generate::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize data for {path}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid dataset {path}: {reason}")]
    InvalidDataset { path: PathBuf, reason: String },

    /// The temp file was written but could not replace the target.
    #[error("Failed to complete write of {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Deserialization { path, source } => {
                format!("The file at {} is not valid JSON: {source}", path.display())
            }
            Self::Serialization { path, .. } => {
                format!("Could not encode the data for {}", path.display())
            }
            Self::InvalidDataset { path, reason } => {
                format!("The dataset at {} is not usable: {reason}", path.display())
            }
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save the file to {}. Please check disk space and permissions.",
                target_path.display()
            ),
        }
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Io { .. } | Self::AtomicWriteFailed { .. } => {
                Some("Check that the store directory exists and is writable.")
            }
            Self::Deserialization { .. } => {
                Some("Fix or remove the file; the store does not repair damaged entries.")
            }
            Self::InvalidDataset { .. } => {
                Some("Datasets look like {\"tables\": {\"name\": {\"rows\": [...]}}}.")
            }
            Self::Serialization { .. } => None,
        }
    }
}

impl From<StoreError> for SourceError {
    fn from(err: StoreError) -> Self {
        SourceError::backend(err.user_message())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
