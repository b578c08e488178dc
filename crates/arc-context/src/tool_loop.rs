//! The tool-call loop (C6): parse `TOOL_REQUEST` blocks out of a model's
//! response, dispatch them, and feed the observations back — bounded by an
//! iteration counter, not the call stack.
//!
//! Grounded on the teacher's `crucible-acp::tools::ToolRegistry` for the
//! dispatch-by-name shape; the wire format itself (the delimited
//! `「始」...「末」` fields) has no teacher analogue and is implemented fresh
//! from spec.md §4.6.

use std::sync::OnceLock;

use arc_core::session::{ToolArguments, ToolCallFrame, ToolOutcome};
use arc_core::{ChatMessage, ChatProvider, ChatRequest, LlmResult};
use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolParseError {
    #[error("tool request block is missing its closing delimiter")]
    UnterminatedBlock,
    #[error("tool request block is missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct ToolExecutionError(pub String);

/// Dispatches a single parsed tool-call frame to whatever backs `tool_kind`.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    async fn dispatch(&self, frame: &ToolCallFrame) -> Result<String, ToolExecutionError>;
}

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<<<\[TOOL_REQUEST\]>>>(.*?)<<<\[END_TOOL_REQUEST\]>>>").unwrap()
    })
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(\w+)\s*:\s*「始」(.*?)「末」").unwrap())
}

const BLOCK_START: &str = "<<<[TOOL_REQUEST]>>>";

/// One scanned tool request: either a successfully parsed frame, or a parse
/// failure that must still be reported back to the model (spec.md §4.6:
/// malformed blocks are tool errors, never silently dropped).
pub enum ScannedRequest {
    Parsed(ToolCallFrame),
    Malformed { raw_text: String, error: ToolParseError },
}

/// Scan `text` for zero or more `TOOL_REQUEST` blocks, in document order.
pub fn scan_tool_requests(text: &str) -> Vec<ScannedRequest> {
    let mut results = Vec::new();
    let mut matched_count = 0;

    for capture in block_regex().captures_iter(text) {
        matched_count += 1;
        let whole = capture.get(0).unwrap().as_str().to_string();
        let body = capture.get(1).unwrap().as_str();
        let mut fields: ToolArguments = ToolArguments::new();
        for field in field_regex().captures_iter(body) {
            let key = field.get(1).unwrap().as_str().to_string();
            let value = field.get(2).unwrap().as_str().trim().to_string();
            fields.insert(key, value);
        }

        let parsed = (|| -> Result<ToolCallFrame, ToolParseError> {
            let tool_kind = fields.get("agentType").cloned().ok_or(ToolParseError::MissingField("agentType"))?;
            let target_name = fields.get("agent_name").cloned().ok_or(ToolParseError::MissingField("agent_name"))?;
            fields.get("query").ok_or(ToolParseError::MissingField("query"))?;
            Ok(ToolCallFrame { tool_kind, target_name, arguments: fields.clone(), raw_text: whole.clone(), result: None })
        })();

        match parsed {
            Ok(frame) => results.push(ScannedRequest::Parsed(frame)),
            Err(error) => results.push(ScannedRequest::Malformed { raw_text: whole, error }),
        }
    }

    // A start marker with no matching end marker never satisfies the block
    // regex (it is non-greedy and requires the closing delimiter), so it
    // would otherwise vanish silently. Surface it as one malformed block
    // covering the remaining text.
    let start_count = text.matches(BLOCK_START).count();
    if start_count > matched_count {
        if let Some(start) = text.rfind(BLOCK_START) {
            results.push(ScannedRequest::Malformed {
                raw_text: text[start..].to_string(),
                error: ToolParseError::UnterminatedBlock,
            });
        }
    }

    results
}

/// Render the observation text for one scanned request (success, execution
/// error, or parse error), used to compose the loop's user message.
async fn observe(request: &ScannedRequest, dispatcher: &dyn ToolDispatcher) -> (String, Option<ToolOutcome>) {
    match request {
        ScannedRequest::Parsed(frame) => match dispatcher.dispatch(frame).await {
            Ok(observation) => (observation.clone(), Some(ToolOutcome::Success(observation))),
            Err(error) => {
                let message = format!("tool execution error ({}/{}): {}", frame.tool_kind, frame.target_name, error.0);
                (message.clone(), Some(ToolOutcome::Error(message)))
            }
        },
        ScannedRequest::Malformed { raw_text, error } => {
            (format!("tool parse error: {error}\noffending block:\n{raw_text}"), None)
        }
    }
}

/// Run the bounded tool-call loop against `provider`, starting from
/// `messages`, returning the model's final answer text.
///
/// `max_depth` mirrors `tool_loop.max_depth` (default 5): every tool request
/// is dispatched and its observation appended before the depth counter is
/// checked, so the round that reaches the ceiling is still fully recorded in
/// history. Once `depth` reaches `max_depth`, a terminal instruction is
/// appended and exactly one more call is made, returned unconditionally
/// regardless of whether it still contains tool requests.
pub async fn run_tool_loop(
    provider: &dyn ChatProvider,
    mut messages: Vec<ChatMessage>,
    dispatcher: &dyn ToolDispatcher,
    max_depth: u32,
) -> LlmResult<String> {
    let mut depth = 0u32;

    loop {
        let response = provider.chat(ChatRequest::new(messages.clone())).await?;
        let answer = response.message.content.clone();
        messages.push(ChatMessage::assistant(answer.clone()));

        let requests = scan_tool_requests(&answer);
        if requests.is_empty() {
            return Ok(answer);
        }

        let mut observation = String::new();
        for request in &requests {
            let (text, _outcome) = observe(request, dispatcher).await;
            observation.push_str(&text);
            observation.push('\n');
        }
        messages.push(ChatMessage::user(observation));
        depth += 1;

        if depth >= max_depth {
            messages.push(ChatMessage::user(
                "Tool-call depth limit reached. Produce your final answer now without requesting further tools.",
            ));
            let final_response = provider.chat(ChatRequest::new(messages)).await?;
            return Ok(final_response.message.content);
        }
    }
}
