//! Block summaries carried forward as interview context.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::model::{Block, QuestionAnswer};
use super::prompts::summary_prompt;

/// Reduces a finished block's dialogue to a short text.
#[async_trait]
pub trait BlockSummarizer: Send + Sync {
    async fn summarize(&self, block: &Block, dialogue: &[QuestionAnswer]) -> Result<String, LlmError>;
}

/// Summarizes through the generator. No retry.
pub struct LlmBlockSummarizer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl LlmBlockSummarizer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }
}

#[async_trait]
impl BlockSummarizer for LlmBlockSummarizer {
    async fn summarize(&self, block: &Block, dialogue: &[QuestionAnswer]) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![ChatMessage::system(summary_prompt(
            block, dialogue,
        ))])
        .with_temperature(0.7)
        .with_max_tokens(self.max_tokens);

        let response = self.llm.complete(request).await?;
        let summary = response.content.trim().to_string();
        tracing::debug!(block = block.id, chars = summary.len(), "Block summarized");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    fn block() -> Block {
        Block {
            id: 1,
            name: "intro".into(),
            title: "Intro".into(),
            context_prompt: "p".into(),
            focus_areas: vec![],
            questions: vec!["q".into()],
        }
    }

    #[tokio::test]
    async fn returns_trimmed_summary() {
        let llm = Arc::new(ScriptedLlm::new(["  Likes hiking.  \n"]));
        let summarizer = LlmBlockSummarizer::new(llm.clone(), 800);
        let dialogue = vec![QuestionAnswer {
            question: "Hobbies?".into(),
            answer: "Hiking".into(),
        }];

        let summary = summarizer.summarize(&block(), &dialogue).await.unwrap();
        assert_eq!(summary, "Likes hiking.");
        assert!(llm.requests()[0].messages[0].content.contains("Hobbies?"));
    }

    #[tokio::test]
    async fn failure_is_returned() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        llm.push_err("overloaded");
        let summarizer = LlmBlockSummarizer::new(llm, 800);
        assert!(summarizer.summarize(&block(), &[]).await.is_err());
    }
}
