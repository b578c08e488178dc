//! High Priestess — knowledge assessment.
//!
//! Consumes the vault via `keyword_match` seeded from the user query, then
//! neighborhood-expands the best match. Notes already dense in the graph
//! (density above the configured threshold) are treated as "known"; the
//! rest of the relevant set is "unknown but relevant" — the candidate
//! material the later stages should plan around.

use std::collections::BTreeSet;

use arc_context::ContextManager;
use arc_context::{ToolDescriptor, ToolDispatcher};
use arc_core::session::LearningSession;
use arc_core::ChatProvider;
use serde::{Deserialize, Serialize};

use crate::error::AgentOpResult;
use crate::parse::extract_field;

const KNOWN_DENSITY_THRESHOLD: f64 = 0.3;
const KEYWORD_MATCH_LIMIT: usize = 20;
const NEIGHBOR_RADIUS: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriestessOutcome {
    pub known: Vec<String>,
    pub unknown_relevant: Vec<String>,
    pub cognitive_load_flags: Vec<String>,
    pub rationale: String,
}

pub const PROMPT_FRAGMENT: &str = "You are the High Priestess: assess what the learner already knows \
and what is relevant-but-unknown, using the candidate concepts supplied below. \
Respond with `COGNITIVE_LOAD: <comma-separated flags or none>` on one line and \
`RATIONALE: <free text>` on the next.";

pub async fn run(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    _session: &LearningSession,
    query: &str,
) -> AgentOpResult<PriestessOutcome> {
    let matches = ctx.links().keyword_match(query, KEYWORD_MATCH_LIMIT).await;

    let mut known: BTreeSet<String> = BTreeSet::new();
    let mut unknown_relevant: BTreeSet<String> = BTreeSet::new();

    for m in &matches {
        if ctx.links().density(&m.slug).await >= KNOWN_DENSITY_THRESHOLD {
            known.insert(m.slug.clone());
        } else {
            unknown_relevant.insert(m.slug.clone());
        }
    }

    if let Some(top) = matches.first() {
        for (_, slugs) in ctx.links().neighbors(&top.slug, NEIGHBOR_RADIUS).await {
            for slug in slugs {
                if !known.contains(&slug) {
                    unknown_relevant.insert(slug);
                }
            }
        }
    }

    let history = arc_context::History::new();
    let prompt = ctx.build_prompt(PROMPT_FRAGMENT, tools, query, &history).await;
    let answer = arc_context::run_tool_loop(
        provider,
        vec![arc_core::ChatMessage::system(prompt), arc_core::ChatMessage::user(query)],
        dispatcher,
        tool_loop_max_depth,
    )
    .await?;

    let cognitive_load_flags = extract_field(&answer, "COGNITIVE_LOAD")
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "none")
                .collect()
        })
        .unwrap_or_default();
    let rationale = extract_field(&answer, "RATIONALE").unwrap_or(answer);

    Ok(PriestessOutcome {
        known: known.into_iter().collect(),
        unknown_relevant: unknown_relevant.into_iter().collect(),
        cognitive_load_flags,
        rationale,
    })
}
