//! The Agent Orchestrator: the session registry, push-channel event
//! contract, and five-stage pipeline runner that sits on top of
//! `arc_agents`, `arc_context`, `arc_links`, and `arc_vault`.

pub mod error;
pub mod events;
mod orchestrator;

pub use error::{OrchestratorError, OrchestratorResult};
pub use events::{PushEvent, PushEventKind};
pub use orchestrator::Orchestrator;
