use arc_core::LlmError;
use arc_vault::VaultError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("no known starting concept to plan a path from")]
    NoKnownConcept,

    #[error("learning path of {length} steps exceeds the configured maximum of {max}")]
    PathTooLong { length: usize, max: usize },

    #[error("draft for `{slug}` is missing a required link after retry")]
    MissingRequiredLink { slug: String },

    #[error("could not parse agent output: {0}")]
    Parse(String),
}

pub type AgentOpResult<T> = Result<T, AgentError>;
