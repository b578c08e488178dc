//! The Agent Orchestrator (C8): owns the session registry and progress
//! channel, and sequences the five `arc_agents` stages as spec.md §4.7's
//! state machine.
//!
//! Grounded on the teacher's `crucible-cli::progress::LiveProgress` for the
//! `tokio::sync::watch` cancellation-signal shape, and `ContextManager`'s
//! own "cheap to clone, `Arc` all the way down" convention (here the whole
//! `Orchestrator` is one `Arc<Inner>`, so the background TTL sweeper can
//! hold its own cloned handle without an unusual `Arc<Self>` receiver).

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_agents::{empress, hermit, justice, magician, priestess, AgentKind};
use arc_agents::{HermitOutcome, MagicianOutcome, PriestessOutcome};
use arc_config::Config;
use arc_context::{vault_tool_descriptors, ContextManager, ToolDescriptor, VaultToolDispatcher};
use arc_core::session::{AgentResult, LearningSession, SessionEventKind, SessionStatus, StageName, StageStatus};
use arc_core::ChatProvider;
use arc_links::LinkEngine;
use arc_vault::NoteStore;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch, RwLock, Semaphore};
use uuid::Uuid;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::PushEvent;

const STATIC_PREFIX: &str = "You are Arcanum, a personal learning assistant. You drive a fixed \
five-stage pipeline — High Priestess, Hermit, Magician, Justice, Empress — over a local markdown \
vault of the learner's notes, weaving new content into the existing `[[wiki-link]]` graph. Always \
respond in the format each stage's instructions request.";

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct SessionHandle {
    session: Arc<RwLock<LearningSession>>,
    cancel_tx: watch::Sender<bool>,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

struct Deps {
    provider: Arc<dyn ChatProvider>,
    context: ContextManager,
    dispatcher: VaultToolDispatcher,
    tools: Vec<ToolDescriptor>,
    store: Arc<NoteStore>,
    links: Arc<LinkEngine>,
    tool_loop_max_depth: u32,
    max_path_length: usize,
    stage_timeout: Duration,
}

struct Inner {
    sessions: DashMap<Uuid, SessionHandle>,
    events: DashMap<Uuid, broadcast::Sender<PushEvent>>,
    semaphore: Arc<Semaphore>,
    ttl: Duration,
    deps: Deps,
}

/// Owner of the session registry and progress channels. Cheap to clone —
/// every clone shares the same registry via `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn ChatProvider>, store: Arc<NoteStore>, links: Arc<LinkEngine>, config: Config) -> Self {
        let mut tools = arc_agents::agent_tool_descriptors();
        tools.extend(vault_tool_descriptors());

        let context = ContextManager::new(store.clone(), links.clone(), config.context.clone(), STATIC_PREFIX);
        let dispatcher = VaultToolDispatcher::new(links.clone());

        let deps = Deps {
            provider,
            context,
            dispatcher,
            tools,
            store,
            links,
            tool_loop_max_depth: config.tool_loop.max_depth,
            max_path_length: config.links.max_path_length,
            stage_timeout: Duration::from_secs(config.llm.timeout_s * 5),
        };

        let inner = Arc::new(Inner {
            sessions: DashMap::new(),
            events: DashMap::new(),
            semaphore: Arc::new(Semaphore::new(config.sessions.max_concurrent)),
            ttl: Duration::from_secs(config.sessions.ttl_min * 60),
            deps,
        });

        let orchestrator = Self { inner };
        orchestrator.spawn_ttl_sweeper();
        orchestrator
    }

    fn spawn_ttl_sweeper(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                handle.sweep_expired_sessions().await;
            }
        });
    }

    async fn sweep_expired_sessions(&self) {
        let now = chrono::Utc::now();
        let candidates: Vec<(Uuid, Arc<RwLock<LearningSession>>)> =
            self.inner.sessions.iter().map(|e| (*e.key(), e.value().session.clone())).collect();

        let ttl = chrono::Duration::from_std(self.inner.ttl).unwrap_or(chrono::Duration::zero());
        let mut expired = Vec::new();
        for (id, session) in candidates {
            let updated_at = session.read().await.updated_at;
            if now.signed_duration_since(updated_at) > ttl {
                expired.push(id);
            }
        }

        for id in expired {
            if let Some((_, handle)) = self.inner.sessions.remove(&id) {
                let _ = handle.cancel_tx.send(true);
            }
            self.inner.events.remove(&id);
            tracing::info!(session_id = %id, "session TTL expired, garbage collected");
        }
    }

    /// Create a session and register it, without starting the pipeline.
    /// Rejects with `Busy` if `sessions.max_concurrent` permits are
    /// exhausted (non-blocking, per spec.md §5).
    pub async fn start(&self, query: impl Into<String>) -> OrchestratorResult<Uuid> {
        let permit = self.inner.semaphore.clone().try_acquire_owned().map_err(|_| OrchestratorError::Busy)?;
        let session = LearningSession::new(query);
        let id = session.id;
        let (cancel_tx, _) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        self.inner.sessions.insert(
            id,
            SessionHandle { session: Arc::new(RwLock::new(session)), cancel_tx, _permit: permit },
        );
        self.inner.events.insert(id, event_tx);
        Ok(id)
    }

    /// Create a session and run all five stages to completion asynchronously.
    pub async fn orchestrate(&self, query: impl Into<String>) -> OrchestratorResult<Uuid> {
        let query = query.into();
        let id = self.start(query.clone()).await?;
        let handle = self.clone();
        tokio::spawn(async move { handle.run_pipeline(id, query).await });
        Ok(id)
    }

    /// Advance exactly one stage — the session's current stage, which must
    /// match `stage` — with an explicit query string.
    pub async fn execute_agent(&self, session_id: Uuid, stage: StageName, query: &str) -> OrchestratorResult<()> {
        let handle = self.handle(session_id)?;
        {
            let guard = handle.read().await;
            if guard.status != SessionStatus::Running {
                return Err(OrchestratorError::NotRunning(session_id));
            }
            let current = guard.current_stage_name();
            if current != Some(stage) {
                return Err(OrchestratorError::WrongStage { requested: stage, current });
            }
        }
        self.advance_one_stage(session_id, stage, query).await
    }

    pub async fn get(&self, session_id: Uuid) -> OrchestratorResult<LearningSession> {
        let handle = self.handle(session_id)?;
        Ok(handle.read().await.clone())
    }

    /// Subscribe to this session's push-channel events. A lagging subscriber
    /// loses the oldest events it hasn't read (broadcast's drop-oldest
    /// semantics); it never slows the pipeline (spec.md §4.8, REDESIGN
    /// FLAGS).
    pub fn subscribe(&self, session_id: Uuid) -> OrchestratorResult<broadcast::Receiver<PushEvent>> {
        self.inner
            .events
            .get(&session_id)
            .map(|tx| tx.subscribe())
            .ok_or(OrchestratorError::NotFound(session_id))
    }

    /// Cancel a running session. The in-flight stage future is dropped
    /// (abandoning any in-progress LLM call); writes already performed by
    /// Empress are not rolled back.
    pub async fn cancel(&self, session_id: Uuid) -> OrchestratorResult<()> {
        let session = {
            let entry = self.inner.sessions.get(&session_id).ok_or(OrchestratorError::NotFound(session_id))?;
            let _ = entry.cancel_tx.send(true);
            entry.session.clone()
        };
        let mut guard = session.write().await;
        guard.status = SessionStatus::Cancelled;
        Ok(())
    }

    fn handle(&self, session_id: Uuid) -> OrchestratorResult<Arc<RwLock<LearningSession>>> {
        self.inner
            .sessions
            .get(&session_id)
            .map(|h| h.session.clone())
            .ok_or(OrchestratorError::NotFound(session_id))
    }

    fn emit(&self, session_id: Uuid, stage: Option<StageName>, kind: &SessionEventKind) {
        if let Some(tx) = self.inner.events.get(&session_id) {
            let _ = tx.send(PushEvent::from_session_event(session_id, stage, kind));
        }
    }

    async fn run_pipeline(&self, session_id: Uuid, query: String) {
        for stage in StageName::ORDER {
            let cancelled = {
                let Some(handle) = self.inner.sessions.get(&session_id) else { return };
                *handle.cancel_tx.borrow()
            };
            if cancelled {
                return;
            }

            if let Err(err) = self.advance_one_stage(session_id, stage, &query).await {
                tracing::warn!(session_id = %session_id, stage = ?stage, error = %err, "stage failed, terminating session");
                return;
            }

            let Some(handle) = self.inner.sessions.get(&session_id) else { return };
            if handle.session.read().await.status != SessionStatus::Running {
                return;
            }
        }

        if let Some(handle) = self.inner.sessions.get(&session_id) {
            let mut guard = handle.session.write().await;
            guard.status = SessionStatus::Completed;
            guard.record_event(None, SessionEventKind::SessionCompleted);
            drop(guard);
        }
        self.emit(session_id, None, &SessionEventKind::SessionCompleted);
    }

    /// Run one stage end to end: mark running, race it against cancellation
    /// and the soft per-stage timeout, commit the result or error.
    async fn advance_one_stage(&self, session_id: Uuid, stage: StageName, query: &str) -> OrchestratorResult<()> {
        let handle = self.handle(session_id)?;
        {
            let mut guard = handle.session.write().await;
            guard.stages[stage.index()].status = StageStatus::Running;
            guard.stages[stage.index()].started_at = Some(chrono::Utc::now());
            guard.record_event(Some(stage), SessionEventKind::StageStarted);
        }
        self.emit(session_id, Some(stage), &SessionEventKind::StageStarted);

        let kind = stage_to_kind(stage);
        let mut cancel_rx = {
            let Some(entry) = self.inner.sessions.get(&session_id) else {
                return Err(OrchestratorError::NotFound(session_id));
            };
            entry.cancel_tx.subscribe()
        };

        let stage_future = self.run_stage(kind, &handle, query);
        let outcome = tokio::select! {
            result = tokio::time::timeout(self.inner.deps.stage_timeout, stage_future) => {
                match result {
                    Ok(inner_result) => inner_result,
                    Err(_) => Err(OrchestratorError::StageTimeout),
                }
            }
            _ = cancel_rx.changed() => Err(OrchestratorError::Cancelled(session_id)),
        };

        let mut guard = handle.session.write().await;
        match outcome {
            Ok(result) => {
                guard.stages[stage.index()].status = StageStatus::Completed;
                guard.stages[stage.index()].progress = 1.0;
                guard.stages[stage.index()].ended_at = Some(chrono::Utc::now());
                guard.stages[stage.index()].result = Some(result);
                guard.current_stage = (stage.index() + 1).min(StageName::ORDER.len() - 1);
                guard.record_event(Some(stage), SessionEventKind::StageCompleted);
                drop(guard);
                self.emit(session_id, Some(stage), &SessionEventKind::StageCompleted);
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                guard.stages[stage.index()].status = StageStatus::Error;
                guard.stages[stage.index()].ended_at = Some(chrono::Utc::now());
                guard.stages[stage.index()].error = Some(message.clone());
                guard.status = if matches!(err, OrchestratorError::Cancelled(_)) {
                    SessionStatus::Cancelled
                } else {
                    SessionStatus::Error
                };
                guard.record_event(Some(stage), SessionEventKind::Error { message: message.clone() });
                drop(guard);
                self.emit(session_id, Some(stage), &SessionEventKind::Error { message });
                Err(err)
            }
        }
    }

    async fn run_stage(&self, kind: AgentKind, handle: &Arc<RwLock<LearningSession>>, query: &str) -> OrchestratorResult<AgentResult> {
        let deps = &self.inner.deps;
        let start = Instant::now();

        let metadata: serde_json::Value = match kind {
            AgentKind::HighPriestess => {
                let session_snapshot = handle.read().await.clone();
                let outcome = priestess::run(
                    deps.provider.as_ref(),
                    &deps.context,
                    &deps.dispatcher,
                    &deps.tools,
                    deps.tool_loop_max_depth,
                    &session_snapshot,
                    query,
                )
                .await?;
                serde_json::to_value(&outcome).expect("PriestessOutcome serializes")
            }
            AgentKind::Hermit => {
                let priestess_outcome: PriestessOutcome = self.stage_outcome(handle, StageName::HighPriestess).await?;
                let outcome = hermit::run(
                    deps.provider.as_ref(),
                    &deps.context,
                    &deps.dispatcher,
                    &deps.tools,
                    deps.tool_loop_max_depth,
                    &priestess_outcome,
                    deps.max_path_length,
                )
                .await?;
                serde_json::to_value(&outcome).expect("HermitOutcome serializes")
            }
            AgentKind::Magician => {
                let priestess_outcome: PriestessOutcome = self.stage_outcome(handle, StageName::HighPriestess).await?;
                let hermit_outcome: HermitOutcome = self.stage_outcome(handle, StageName::Hermit).await?;
                let outcome = magician::run(
                    deps.provider.as_ref(),
                    &deps.context,
                    &deps.dispatcher,
                    &deps.tools,
                    deps.tool_loop_max_depth,
                    &hermit_outcome,
                    &priestess_outcome.known,
                )
                .await?;
                serde_json::to_value(&outcome).expect("MagicianOutcome serializes")
            }
            AgentKind::Justice => {
                let magician_outcome: MagicianOutcome = self.stage_outcome(handle, StageName::Magician).await?;
                let answers: Option<Vec<String>> =
                    if query.trim().is_empty() { None } else { Some(query.lines().map(str::to_string).collect()) };
                let outcome = justice::run(
                    deps.provider.as_ref(),
                    &deps.context,
                    &deps.dispatcher,
                    &deps.tools,
                    deps.tool_loop_max_depth,
                    &magician_outcome,
                    answers.as_deref(),
                )
                .await?;
                serde_json::to_value(&outcome).expect("JusticeOutcome serializes")
            }
            AgentKind::Empress => {
                let magician_outcome: MagicianOutcome = self.stage_outcome(handle, StageName::Magician).await?;
                let outcome = empress::run(&deps.store, &deps.links, &magician_outcome).await?;
                serde_json::to_value(&outcome).expect("EmpressOutcome serializes")
            }
        };

        Ok(AgentResult {
            agent_name: kind.name().to_string(),
            confidence: confidence_for(kind, &metadata),
            execution_time_ms: start.elapsed().as_millis() as u64,
            content: summarize(kind, &metadata),
            metadata,
        })
    }

    async fn stage_outcome<T: DeserializeOwned>(&self, handle: &Arc<RwLock<LearningSession>>, stage: StageName) -> OrchestratorResult<T> {
        let guard = handle.read().await;
        let record = &guard.stages[stage.index()];
        let metadata = record
            .result
            .as_ref()
            .map(|r| r.metadata.clone())
            .ok_or(OrchestratorError::WrongStage { requested: stage, current: guard.current_stage_name() })?;
        serde_json::from_value(metadata).map_err(|_| OrchestratorError::WrongStage { requested: stage, current: guard.current_stage_name() })
    }
}

fn stage_to_kind(stage: StageName) -> AgentKind {
    match stage {
        StageName::HighPriestess => AgentKind::HighPriestess,
        StageName::Hermit => AgentKind::Hermit,
        StageName::Magician => AgentKind::Magician,
        StageName::Justice => AgentKind::Justice,
        StageName::Empress => AgentKind::Empress,
    }
}

fn confidence_for(kind: AgentKind, metadata: &serde_json::Value) -> f64 {
    match kind {
        AgentKind::Justice => metadata
            .get("scores")
            .and_then(|s| s.as_array())
            .filter(|scores| !scores.is_empty())
            .map(|scores| {
                let total: f64 = scores.iter().filter_map(|s| s.get("score").and_then(|v| v.as_u64())).map(|v| v as f64).sum();
                (total / (scores.len() as f64 * 5.0)).clamp(0.0, 1.0)
            })
            .unwrap_or(0.7),
        _ => 1.0,
    }
}

fn summarize(kind: AgentKind, metadata: &serde_json::Value) -> String {
    match kind {
        AgentKind::HighPriestess | AgentKind::Hermit => {
            metadata.get("rationale").and_then(|v| v.as_str()).unwrap_or_default().to_string()
        }
        AgentKind::Magician => {
            let count = metadata.get("drafts").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
            format!("{count} draft note(s) generated")
        }
        AgentKind::Justice => {
            let count = metadata.get("questions").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
            format!("{count} comprehension question(s)")
        }
        AgentKind::Empress => {
            let created = metadata.get("created").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
            let modified = metadata.get("modified").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
            format!("created {created} note(s), modified {modified} note(s)")
        }
    }
}
