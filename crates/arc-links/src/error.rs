//! Error type for Link Engine operations.

use thiserror::Error;

pub type LinkEngineResult<T> = std::result::Result<T, LinkEngineError>;

#[derive(Debug, Error)]
pub enum LinkEngineError {
    #[error("note not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Vault(#[from] arc_vault::VaultError),
}
