//! Shared domain types for the Arcanum learning orchestration engine:
//! notes and front-matter, slug identity, session/stage state, and the
//! provider-agnostic chat completion surface every agent stage talks to.

pub mod llm;
pub mod note;
pub mod session;
pub mod slug;

pub use llm::{
    ChatMessage, ChatProvider, ChatRequest, ChatResponse, LlmError, LlmResult, MessageRole,
    TokenUsage,
};
pub use note::{FrontMatter, Note};
pub use session::{
    AgentResult, LearningSession, SessionEvent, SessionEventKind, SessionStatus, StageName,
    StageRecord, StageStatus, ToolArguments, ToolCallFrame, ToolOutcome,
};
