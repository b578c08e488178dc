//! Justice — comprehension check.
//!
//! Generates 3–5 questions targeting the links the Magician's drafts
//! require the learner to have formed. If the caller supplies the
//! learner's answers, scores each one against the question's draft link;
//! otherwise the questions are returned for later answering.

use arc_context::{ContextManager, ToolDescriptor, ToolDispatcher};
use arc_core::ChatProvider;
use serde::{Deserialize, Serialize};

use crate::error::AgentOpResult;
use crate::magician::MagicianOutcome;
use crate::parse::{extract_field, extract_questions};

pub const QUESTION_PROMPT_FRAGMENT: &str = "You are Justice: write 3 to 5 comprehension questions that \
probe whether the learner has formed the new links introduced by the drafts below. Each question must \
be on its own line, prefixed `Q: `.";

pub const SCORING_PROMPT_FRAGMENT: &str = "You are Justice: score the learner's answers below against \
the question they respond to, on a 0-5 scale. Respond with `SCORE_<n>: <0-5>` and \
`FEEDBACK_<n>: <free text>` for each numbered pair, 1-indexed.";

const MIN_QUESTIONS: usize = 3;
const MAX_QUESTIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionScore {
    pub question: String,
    pub answer: String,
    pub score: Option<u8>,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JusticeOutcome {
    pub questions: Vec<String>,
    pub scores: Option<Vec<QuestionScore>>,
}

fn draft_summary(magician: &MagicianOutcome) -> String {
    magician
        .drafts
        .iter()
        .map(|d| format!("- {} ({})", d.slug, d.front_matter.title.as_deref().unwrap_or(&d.slug)))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn generate_questions(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    magician: &MagicianOutcome,
) -> AgentOpResult<Vec<String>> {
    let query = format!("drafts:\n{}", draft_summary(magician));
    let history = arc_context::History::new();
    let prompt = ctx.build_prompt(QUESTION_PROMPT_FRAGMENT, tools, &query, &history).await;
    let answer = arc_context::run_tool_loop(
        provider,
        vec![arc_core::ChatMessage::system(prompt), arc_core::ChatMessage::user(query)],
        dispatcher,
        tool_loop_max_depth,
    )
    .await?;

    let mut questions = extract_questions(&answer);
    questions.truncate(MAX_QUESTIONS);
    while questions.len() < MIN_QUESTIONS && !magician.drafts.is_empty() {
        let index = questions.len() % magician.drafts.len();
        let slug = &magician.drafts[index].slug;
        questions.push(format!("What link does `{slug}` add to your knowledge graph?"));
    }
    Ok(questions)
}

async fn score_answers(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    questions: &[String],
    answers: &[String],
) -> AgentOpResult<Vec<QuestionScore>> {
    let pairs: String = questions
        .iter()
        .zip(answers.iter())
        .enumerate()
        .map(|(i, (q, a))| format!("{}) Q: {q}\n   A: {a}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let history = arc_context::History::new();
    let prompt = ctx.build_prompt(SCORING_PROMPT_FRAGMENT, tools, &pairs, &history).await;
    let answer = arc_context::run_tool_loop(
        provider,
        vec![arc_core::ChatMessage::system(prompt), arc_core::ChatMessage::user(pairs)],
        dispatcher,
        tool_loop_max_depth,
    )
    .await?;

    let mut scores = Vec::with_capacity(questions.len());
    for (i, (question, learner_answer)) in questions.iter().zip(answers.iter()).enumerate() {
        let label = format!("SCORE_{}", i + 1);
        let score = extract_field(&answer, &label).and_then(|raw| raw.trim().parse::<u8>().ok());
        let feedback = extract_field(&answer, &format!("FEEDBACK_{}", i + 1)).unwrap_or_default();
        scores.push(QuestionScore {
            question: question.clone(),
            answer: learner_answer.clone(),
            score,
            feedback,
        });
    }
    Ok(scores)
}

pub async fn run(
    provider: &dyn ChatProvider,
    ctx: &ContextManager,
    dispatcher: &dyn ToolDispatcher,
    tools: &[ToolDescriptor],
    tool_loop_max_depth: u32,
    magician: &MagicianOutcome,
    answers: Option<&[String]>,
) -> AgentOpResult<JusticeOutcome> {
    let questions = generate_questions(provider, ctx, dispatcher, tools, tool_loop_max_depth, magician).await?;

    let scores = match answers {
        Some(answers) if !answers.is_empty() => {
            Some(score_answers(provider, ctx, dispatcher, tools, tool_loop_max_depth, &questions, answers).await?)
        }
        _ => None,
    };

    Ok(JusticeOutcome { questions, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_context::VaultToolDispatcher;
    use arc_core::{ChatMessage, ChatRequest, ChatResponse, FrontMatter, LlmResult, Note, TokenUsage};
    use arc_links::{DensityFormula, LinkEngine};
    use arc_vault::NoteStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::Arc;

    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(&self, _request: ChatRequest) -> LlmResult<ChatResponse> {
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
        links.rebuild(&[Note::new("a", FrontMatter::default(), "")]).await;
        ContextManager::new(store, links, Default::default(), "prefix")
    }

    fn sample_magician() -> MagicianOutcome {
        MagicianOutcome {
            drafts: vec![crate::magician::Draft {
                slug: "markov_chain".to_string(),
                front_matter: FrontMatter { title: Some("Markov Chain".to_string()), ..Default::default() },
                body: "a stochastic process".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn emits_questions_without_scoring_when_no_answers_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = empty_ctx(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = ScriptedProvider {
            responses: Mutex::new(vec!["Q: what is a markov chain?\nQ: name one application.\nQ: what state does it depend on?".to_string()]),
        };

        let outcome = run(&provider, &ctx, &dispatcher, &[], 5, &sample_magician(), None).await.unwrap();
        assert_eq!(outcome.questions.len(), 3);
        assert!(outcome.scores.is_none());
    }

    #[tokio::test]
    async fn scores_answers_when_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = empty_ctx(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = ScriptedProvider {
            responses: Mutex::new(vec![
                "Q: what is a markov chain?\nQ: name one application.\nQ: what does it depend on?".to_string(),
                "SCORE_1: 4\nFEEDBACK_1: good\nSCORE_2: 3\nFEEDBACK_2: ok\nSCORE_3: 5\nFEEDBACK_3: great".to_string(),
            ]),
        };

        let answers = vec!["a process".to_string(), "PageRank".to_string(), "current state".to_string()];
        let outcome = run(&provider, &ctx, &dispatcher, &[], 5, &sample_magician(), Some(&answers)).await.unwrap();

        let scores = outcome.scores.unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].score, Some(4));
        assert_eq!(scores[1].feedback, "ok");
    }

    #[tokio::test]
    async fn fills_in_minimum_questions_when_model_under_produces() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = empty_ctx(&dir).await;
        let dispatcher = VaultToolDispatcher::new(Arc::new(LinkEngine::new(DensityFormula::default())));
        let provider = ScriptedProvider { responses: Mutex::new(vec!["Q: only one question?".to_string()]) };

        let outcome = run(&provider, &ctx, &dispatcher, &[], 5, &sample_magician(), None).await.unwrap();
        assert!(outcome.questions.len() >= 3);
    }
}
