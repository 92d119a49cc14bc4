use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid schema path '{0}'")]
    InvalidPath(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
