//! Local channel: one interview over stdin/stdout.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Sender identity used for every line read from stdin.
pub const CLI_USER: &str = "local-user";

const PROMPT: &str = "> ";

/// Reads answers and commands line by line; replies go to stdout.
#[derive(Debug)]
pub struct CliChannel {
    user: String,
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            user: CLI_USER.to_string(),
        }
    }

    /// Run the local interview under a different identity.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Turn one input line into a message. Blank lines are skipped.
    fn parse_line(&self, line: &str) -> Option<IncomingMessage> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }
        Some(
            IncomingMessage::new("cli", &self.user, text)
                .with_chat_id(&self.user)
                .with_user_name(&self.user),
        )
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = CliChannel {
            user: self.user.clone(),
        };

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            eprint!("{PROMPT}");

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::info!("stdin closed, local session ends");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                match reader.parse_line(&line) {
                    Some(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    None => eprint!("{PROMPT}"),
                }
            }
        });

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        })))
    }

    async fn send(&self, _chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError> {
        let mut stdout = tokio::io::stdout();
        let text = format!("\n{}\n\n", response.content);
        let written = async {
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await
        };
        written.await.map_err(|e| ChannelError::SendFailed {
                name: "cli".into(),
                reason: e.to_string(),
            })?;
        eprint!("{PROMPT}");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_become_messages_for_the_local_user() {
        let channel = CliChannel::new();
        let msg = channel.parse_line("  /start \n").unwrap();
        assert_eq!(msg.channel, "cli");
        assert_eq!(msg.sender_id, CLI_USER);
        assert_eq!(msg.chat_id, CLI_USER);
        assert_eq!(msg.content, "/start");
        assert_eq!(msg.user_name.as_deref(), Some(CLI_USER));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let channel = CliChannel::new();
        assert!(channel.parse_line("").is_none());
        assert!(channel.parse_line(" \t ").is_none());
    }

    #[test]
    fn custom_identity() {
        let msg = CliChannel::new()
            .with_user("tester")
            .parse_line("hello")
            .unwrap();
        assert_eq!(msg.sender_id, "tester");
        assert_eq!(msg.chat_id, "tester");
    }
}
