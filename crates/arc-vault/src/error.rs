//! Error types for vault operations.

use thiserror::Error;

pub type VaultResult<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("note not found: {0}")]
    NotFound(String),

    #[error("path escapes vault root: {0}")]
    PathEscape(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("front-matter serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
