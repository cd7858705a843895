//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// A message received from a user.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that produced the message.
    pub channel: String,
    /// Stable identity of the sender. Sessions and rate limits key on this.
    pub sender_id: String,
    /// Where replies go. Defaults to the sender for direct chats.
    pub chat_id: String,
    pub content: String,
    pub user_name: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            chat_id: sender_id.clone(),
            sender_id,
            content: content.into(),
            user_name: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = chat_id.into();
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }
}

/// A message to deliver to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Stream of inbound messages produced by [`Channel::start`].
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A transport the bot talks to users through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving. The stream ends when the transport closes.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a message to `chat_id`.
    async fn send(&self, chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError>;

    /// Reply in the chat a message came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.send(&msg.chat_id, response).await
    }

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
