//! Learning session state: the record the Orchestrator advances stage by
//! stage, and the small value types (`AgentResult`, `ToolCallFrame`) that
//! flow through it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five tarot-named stages, in the fixed order they must advance through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageName {
    HighPriestess,
    Hermit,
    Magician,
    Justice,
    Empress,
}

impl StageName {
    pub const ORDER: [StageName; 5] = [
        StageName::HighPriestess,
        StageName::Hermit,
        StageName::Magician,
        StageName::Justice,
        StageName::Empress,
    ];

    pub fn index(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).expect("exhaustive")
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ORDER.get(index).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::HighPriestess => "high_priestess",
            StageName::Hermit => "hermit",
            StageName::Magician => "magician",
            StageName::Justice => "justice",
            StageName::Empress => "empress",
        }
    }
}

/// Status of a single stage within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// Output of exactly one agent run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResult {
    pub agent_name: String,
    pub confidence: f64,
    pub execution_time_ms: u64,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// Record of a single stage's lifecycle within a session. Once
/// `status == Completed`, `result` is never overwritten — the orchestrator
/// enforces this, not this type, but the field shape makes that contract
/// visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: StageName,
    pub status: StageStatus,
    pub progress: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub result: Option<AgentResult>,
    pub error: Option<String>,
}

impl StageRecord {
    pub fn pending(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            progress: 0.0,
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
        }
    }
}

/// An entry in a session's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub at: DateTime<Utc>,
    pub stage: Option<StageName>,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    StageStarted,
    ProgressTick { progress: f64 },
    StageCompleted,
    SessionCompleted,
    Error { message: String },
}

/// Overall session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    Completed,
    Error,
    Cancelled,
}

/// One end-to-end run of the five-stage pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: Uuid,
    pub original_query: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_stage: usize,
    pub status: SessionStatus,
    pub stages: [StageRecord; 5],
    pub events: Vec<SessionEvent>,
}

impl LearningSession {
    pub fn new(query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            original_query: query.into(),
            created_at: now,
            updated_at: now,
            current_stage: 0,
            status: SessionStatus::Running,
            stages: StageName::ORDER.map(StageRecord::pending),
            events: Vec::new(),
        }
    }

    /// Overall progress, averaged across the five stages.
    pub fn progress(&self) -> f64 {
        self.stages.iter().map(|s| s.progress).sum::<f64>() / self.stages.len() as f64
    }

    pub fn current_stage_name(&self) -> Option<StageName> {
        StageName::from_index(self.current_stage)
    }

    pub fn record_event(&mut self, stage: Option<StageName>, kind: SessionEventKind) {
        self.events.push(SessionEvent {
            at: Utc::now(),
            stage,
            kind,
        });
        self.updated_at = Utc::now();
    }
}

/// One argument in a `TOOL_REQUEST` block.
pub type ToolArguments = BTreeMap<String, String>;

/// Outcome of dispatching a single tool-call frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolOutcome {
    Success(String),
    Error(String),
}

/// A single parsed `TOOL_REQUEST` block, ephemeral to one tool-call loop
/// invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFrame {
    pub tool_kind: String,
    pub target_name: String,
    pub arguments: ToolArguments,
    pub raw_text: String,
    pub result: Option<ToolOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_fixed() {
        assert_eq!(StageName::HighPriestess.index(), 0);
        assert_eq!(StageName::Empress.index(), 4);
        assert_eq!(StageName::HighPriestess.next(), Some(StageName::Hermit));
        assert_eq!(StageName::Empress.next(), None);
    }

    #[test]
    fn new_session_starts_at_stage_zero_pending() {
        let session = LearningSession::new("Learn about Markov chains");
        assert_eq!(session.current_stage, 0);
        assert_eq!(session.progress(), 0.0);
        assert!(session
            .stages
            .iter()
            .all(|s| s.status == StageStatus::Pending));
    }

    #[test]
    fn recording_events_bumps_updated_at() {
        let mut session = LearningSession::new("q");
        let before = session.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        session.record_event(Some(StageName::HighPriestess), SessionEventKind::StageStarted);
        assert!(session.updated_at >= before);
        assert_eq!(session.events.len(), 1);
    }
}
