//! Magician — content generation.
//!
//! For each step of the Hermit's path that is not already a known concept,
//! asks the model for a new markdown passage and enforces, by re-parsing
//! the draft with `arc_parser`, that it links back to a previously-known
//! concept and forward to a path neighbor. A draft missing either link gets
//! exactly one retry turn with the requirement restated before the stage
//! fails closed.

use arc_context::{ContextManager, ToolDescriptor, ToolDispatcher};
use arc_core::slug;
use arc_core::{ChatProvider, FrontMatter};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentOpResult};
use crate::hermit::HermitOutcome;
use crate::parse::extract_field;

pub const PROMPT_FRAGMENT: &str = "You are the Magician: write one new markdown passage teaching the \
given concept to a learner who already knows the listed concepts. The passage must contain a \
`[[wiki-link]]` to each of the required targets listed below, plus any other links you find useful. \
Respond with `TITLE: <title>` on the first line, then the passage body on the following lines.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub slug: String,
    pub front_matter: FrontMatter,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MagicianOutcome {
    pub drafts: Vec<Draft>,
}

/// Pick the two link targets a draft at `index` in `path` must contain: the
/// nearest already-known-or-drafted concept behind it, and a path neighbor.
fn required_links(path: &[String], known_or_drafted: &[String], index: usize) -> (String, String) {
    let known_link = known_or_drafted.last().cloned().unwrap_or_else(|| path[0].clone());
    let neighbor_link = if index > 0 {
        path[index - 1].clone()
    } else if index + 1 < path.len() {
        path[index + 1].clone()
    } else {
        known_link.clone()
    };
    (known_link, neighbor_link)
}

fn has_link(body: &str, target: &str) -> bool {
    let parsed = arc_parser::parse(body);
    let needle = slug::normalize(target);
    parsed.wikilinks.iter().any(|link| link.target == needle)
}

async fn generate_one(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    slug: &str,
    known_link: &str,
    neighbor_link: &str,
) -> AgentOpResult<Draft> {
    let mut query = format!(
        "write a passage introducing `{slug}`. required links: [[{known_link}]] and [[{neighbor_link}]]."
    );

    for attempt in 0..2 {
        let history = arc_context::History::new();
        let prompt = ctx.build_prompt(PROMPT_FRAGMENT, tools, &query, &history).await;
        let answer = arc_context::run_tool_loop(
            provider,
            vec![arc_core::ChatMessage::system(prompt), arc_core::ChatMessage::user(query.clone())],
            dispatcher,
            tool_loop_max_depth,
        )
        .await?;

        let title = extract_field(&answer, "TITLE").unwrap_or_else(|| slug.to_string());
        let body = strip_title_line(&answer);

        if has_link(&body, known_link) && has_link(&body, neighbor_link) {
            return Ok(Draft {
                slug: slug.to_string(),
                front_matter: FrontMatter { title: Some(title), ..Default::default() },
                body,
            });
        }

        if attempt == 0 {
            query = format!(
                "{query}\nyour previous attempt was missing a required link. you must include \
                 both [[{known_link}]] and [[{neighbor_link}]] literally in the body."
            );
        }
    }

    Err(AgentError::MissingRequiredLink { slug: slug.to_string() })
}

fn strip_title_line(answer: &str) -> String {
    match answer.split_once('\n') {
        Some((first, rest)) if first.trim_start().starts_with("TITLE:") => rest.trim_start_matches('\n').to_string(),
        _ => answer.to_string(),
    }
}

pub async fn run(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    hermit: &HermitOutcome,
    known: &[String],
) -> AgentOpResult<MagicianOutcome> {
    let mut known_or_drafted: Vec<String> = known.to_vec();
    let mut drafts = Vec::new();

    for (index, step) in hermit.path.iter().enumerate() {
        if known.contains(step) {
            continue;
        }
        let (known_link, neighbor_link) = required_links(&hermit.path, &known_or_drafted, index);
        let draft = generate_one(provider, ctx, dispatcher, tools, tool_loop_max_depth, step, &known_link, &neighbor_link).await?;
        known_or_drafted.push(step.clone());
        drafts.push(draft);
    }

    Ok(MagicianOutcome { drafts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_context::VaultToolDispatcher;
    use arc_core::{ChatMessage, ChatRequest, ChatResponse, FrontMatter as FM, LlmResult, Note, TokenUsage};
    use arc_links::{DensityFormula, LinkEngine};
    use arc_vault::NoteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(&self, _request: ChatRequest) -> LlmResult<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let content = if responses.is_empty() { String::new() } else { responses.remove(0) };
            Ok(ChatResponse { message: ChatMessage::assistant(content), usage: TokenUsage::default(), model: "scripted".to_string() })
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted"
        }
    }

    async fn empty_ctx(dir: &tempfile::TempDir) -> ContextManager {
        let store = Arc::new(NoteStore::open(dir.path()).unwrap());
        let links = Arc::new(LinkEngine::new(DensityFormula::default()));
        links.rebuild(&[Note::new("a", FM::default(), ""), Note::new("b", FM::default(), "")]).await;
        ContextManager::new(store, links, Default::default(), "prefix")
    }

    #[tokio::test]
    async fn draft_with_both_required_links_is_accepted_first_try() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = empty_ctx(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = ScriptedProvider {
            responses: Mutex::new(vec!["TITLE: New Concept\nlinks to [[a]] and [[b]] here.".to_string()]),
            calls: AtomicUsize::new(0),
        };

        let hermit = HermitOutcome { path: vec!["a".to_string(), "c".to_string()], rationale: String::new() };
        let outcome = run(&provider, &ctx, &dispatcher, &[], 5, &hermit, &["a".to_string()]).await.unwrap();

        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.drafts[0].slug, "c");
        assert_eq!(outcome.drafts[0].front_matter.title.as_deref(), Some("New Concept"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_link_retries_once_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = empty_ctx(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = ScriptedProvider {
            responses: Mutex::new(vec![
                "TITLE: New Concept\nno links at all.".to_string(),
                "TITLE: New Concept\nstill no links.".to_string(),
            ]),
            calls: AtomicUsize::new(0),
        };

        let hermit = HermitOutcome { path: vec!["a".to_string(), "c".to_string()], rationale: String::new() };
        let result = run(&provider, &ctx, &dispatcher, &[], 5, &hermit, &["a".to_string()]).await;

        assert!(matches!(result, Err(AgentError::MissingRequiredLink { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn known_steps_are_skipped_not_drafted() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = empty_ctx(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = ScriptedProvider { responses: Mutex::new(vec![]), calls: AtomicUsize::new(0) };

        let hermit = HermitOutcome { path: vec!["a".to_string(), "b".to_string()], rationale: String::new() };
        let outcome = run(&provider, &ctx, &dispatcher, &[], 5, &hermit, &["a".to_string(), "b".to_string()]).await.unwrap();

        assert!(outcome.drafts.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
