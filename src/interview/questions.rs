//! Question sources: configured lists or generated questions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::model::{Block, InterviewConfig, QuestionAnswer};
use super::prompts::{BLOCK_COMPLETE_MARKER, question_system_prompt};

/// What a question source sees when asked for the next question.
pub struct QuestionContext<'a> {
    pub config: &'a InterviewConfig,
    pub block: &'a Block,
    /// Summaries of the blocks finished so far.
    pub summaries: &'a [String],
    /// Answered questions of the current block.
    pub dialogue: &'a [QuestionAnswer],
    pub asked: usize,
}

/// The next question, or a signal that the block is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextQuestion {
    pub text: String,
    pub block_complete: bool,
}

impl NextQuestion {
    pub fn ask(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            block_complete: false,
        }
    }

    pub fn complete() -> Self {
        Self {
            text: String::new(),
            block_complete: true,
        }
    }
}

/// Produces interview questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn next_question(&self, ctx: QuestionContext<'_>) -> Result<NextQuestion, LlmError>;
}

/// Walks the block's configured question list in order.
#[derive(Debug, Default)]
pub struct StaticQuestionSource;

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn next_question(&self, ctx: QuestionContext<'_>) -> Result<NextQuestion, LlmError> {
        let next = ctx
            .block
            .questions
            .iter()
            .filter(|q| !q.trim().is_empty())
            .nth(ctx.asked);
        Ok(match next {
            Some(q) => NextQuestion::ask(q.trim()),
            None => NextQuestion::complete(),
        })
    }
}

/// Asks the generator for each question, replaying the block's dialogue.
pub struct LlmQuestionSource {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl LlmQuestionSource {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            temperature: 0.7,
        }
    }
}

#[async_trait]
impl QuestionSource for LlmQuestionSource {
    async fn next_question(&self, ctx: QuestionContext<'_>) -> Result<NextQuestion, LlmError> {
        let mut messages = vec![ChatMessage::system(question_system_prompt(
            ctx.config,
            ctx.block,
            ctx.summaries,
            ctx.asked,
        ))];
        for qa in ctx.dialogue {
            messages.push(ChatMessage::assistant(&qa.question));
            messages.push(ChatMessage::user(&qa.answer));
        }

        let request = CompletionRequest::new(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(max_tokens_for(ctx.config));
        let response = self.llm.complete(request).await?;

        let next = parse_question_response(&response.content);
        tracing::debug!(
            block = ctx.block.id,
            asked = ctx.asked,
            block_complete = next.block_complete,
            "Generated question"
        );
        Ok(next)
    }
}

/// Token allowance for interview calls, scaled by the question budget.
pub fn max_tokens_for(config: &InterviewConfig) -> u32 {
    let budget = u32::try_from(config.question_budget()).unwrap_or(u32::MAX);
    budget.saturating_mul(100).saturating_add(500)
}

/// Parse a generated question, stripping the completion marker.
pub fn parse_question_response(response: &str) -> NextQuestion {
    let marked = response.contains(BLOCK_COMPLETE_MARKER);
    let cleaned = response.replace(BLOCK_COMPLETE_MARKER, "").trim().to_string();

    if marked || cleaned.is_empty() || classify_block_completion(&cleaned) {
        return NextQuestion::complete();
    }
    NextQuestion::ask(cleaned)
}

/// Keyword fallback for models that ignore the marker and announce the end
/// of a block in prose instead.
///
/// This is imprecise: a real question that happens to contain one of these
/// phrases ends the block early. Prefer the explicit marker.
pub fn classify_block_completion(text: &str) -> bool {
    const PHRASES: &[&str] = &[
        "завершаем",
        "переходим",
        "блок завершен",
        "следующий блок",
        "this block is complete",
        "let's move on to the next block",
        "moving on to the next block",
    ];
    let lower = text.to_lowercase();
    PHRASES.iter().any(|p| lower.contains(p))
}
