//! The transport-agnostic push-channel contract (spec.md §6): JSON events
//! `{type, session_id, data, timestamp}` with `type` in {progress, status,
//! result, error}, derived from the session's internal `SessionEventKind`
//! log.

use arc_core::session::{SessionEventKind, StageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushEventKind {
    Progress,
    Status,
    Result,
    Error,
}

/// One event delivered over the push channel. Cheap to clone: bounded
/// channel subscribers receive these by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub event_type: PushEventKind,
    pub session_id: Uuid,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PushEvent {
    /// Translate one internal session-log entry into its wire form.
    pub fn from_session_event(session_id: Uuid, stage: Option<StageName>, kind: &SessionEventKind) -> Self {
        let stage_name = stage.map(StageName::as_str);
        let (event_type, data) = match kind {
            SessionEventKind::StageStarted => {
                (PushEventKind::Status, json!({ "stage": stage_name, "status": "running" }))
            }
            SessionEventKind::ProgressTick { progress } => {
                (PushEventKind::Progress, json!({ "stage": stage_name, "progress": progress }))
            }
            SessionEventKind::StageCompleted => {
                (PushEventKind::Result, json!({ "stage": stage_name, "status": "completed" }))
            }
            SessionEventKind::SessionCompleted => {
                (PushEventKind::Status, json!({ "status": "completed" }))
            }
            SessionEventKind::Error { message } => {
                (PushEventKind::Error, json!({ "stage": stage_name, "message": message }))
            }
        };
        Self { event_type, session_id, data, timestamp: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_started_maps_to_status() {
        let event = PushEvent::from_session_event(Uuid::nil(), Some(StageName::Hermit), &SessionEventKind::StageStarted);
        assert_eq!(event.event_type, PushEventKind::Status);
        assert_eq!(event.data["stage"], "hermit");
    }

    #[test]
    fn error_event_carries_message() {
        let event = PushEvent::from_session_event(
            Uuid::nil(),
            Some(StageName::Magician),
            &SessionEventKind::Error { message: "boom".to_string() },
        );
        assert_eq!(event.event_type, PushEventKind::Error);
        assert_eq!(event.data["message"], "boom");
    }
}
