//! Error type for Orchestrator operations.

use arc_core::session::StageName;
use thiserror::Error;
use uuid::Uuid;

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// `sessions.max_concurrent` permits are all in use; `start`/`orchestrate`
    /// reject rather than queue (spec.md §5: "rejects additional start/
    /// orchestrate calls with a busy error").
    #[error("too many concurrent sessions; try again later")]
    Busy,

    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("session {0} is not running")]
    NotRunning(Uuid),

    #[error("requested stage {requested:?} is not the session's current stage ({current:?})")]
    WrongStage { requested: StageName, current: Option<StageName> },

    #[error("session {0} was cancelled")]
    Cancelled(Uuid),

    #[error("stage exceeded its soft timeout")]
    StageTimeout,

    #[error(transparent)]
    Agent(#[from] arc_agents::AgentError),
}
