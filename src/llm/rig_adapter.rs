//! Bridge from rig-core agents to our `LlmProvider` trait.
//!
//! rig's agent builder is generic over the backend's completion model, so the
//! backend-specific part is captured in a closure built in `llm::mod` where all
//! types are concrete. The adapter itself only reshapes the conversation.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use rig::completion::Message;

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role,
};

/// A conversation reshaped into rig's preamble / history / prompt form.
pub struct PreparedChat {
    pub preamble: String,
    pub history: Vec<Message>,
    pub prompt: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

type ChatFuture = Pin<Box<dyn Future<Output = Result<String, String>> + Send>>;

/// `LlmProvider` backed by a rig-core agent.
pub struct RigAdapter {
    provider: &'static str,
    model_name: String,
    chat: Box<dyn Fn(PreparedChat) -> ChatFuture + Send + Sync>,
}

impl RigAdapter {
    pub fn new<F, Fut>(provider: &'static str, model_name: &str, chat: F) -> Self
    where
        F: Fn(PreparedChat) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        Self {
            provider,
            model_name: model_name.to_string(),
            chat: Box::new(move |prepared| Box::pin(chat(prepared))),
        }
    }
}

#[async_trait]
impl LlmProvider for RigAdapter {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prepared = prepare_chat(request)?;
        let content = (self.chat)(prepared)
            .await
            .map_err(|reason| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason,
            })?;

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "empty completion".to_string(),
            });
        }

        Ok(CompletionResponse::text(content))
    }
}

/// Split a conversation into preamble (all system messages), history and the
/// trailing user prompt. A system-only conversation is sent as the prompt.
pub fn prepare_chat(request: CompletionRequest) -> Result<PreparedChat, LlmError> {
    let (system, mut turns): (Vec<ChatMessage>, Vec<ChatMessage>) = request
        .messages
        .into_iter()
        .partition(|m| m.role == Role::System);

    let mut preamble = system
        .into_iter()
        .map(|m| m.content)
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = match turns.pop() {
        Some(last) if last.role == Role::User => last.content,
        Some(_) => {
            return Err(LlmError::InvalidRequest(
                "conversation must end with a user message".to_string(),
            ));
        }
        None if !preamble.is_empty() => std::mem::take(&mut preamble),
        None => return Err(LlmError::InvalidRequest("empty conversation".to_string())),
    };

    let history = turns
        .into_iter()
        .map(|m| match m.role {
            Role::Assistant => Message::assistant(m.content),
            _ => Message::user(m.content),
        })
        .collect();

    Ok(PreparedChat {
        preamble,
        history,
        prompt,
        temperature: request.temperature.map(f64::from),
        max_tokens: request.max_tokens.map(u64::from),
    })
}
