//! Inbound text classification: slash commands versus interview answers.

/// Commands the bot understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status,
    Restart,
    Stop,
    GetProfile,
    GetSummary,
    Unknown(String),
}

/// One inbound message, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Answer(String),
}

impl Input {
    /// Anything starting with `/` is a command; the rest is an answer.
    ///
    /// A `@botname` suffix on the command word is ignored, and arguments
    /// after the first word are dropped.
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();
        if !trimmed.starts_with('/') {
            return Input::Answer(content.to_string());
        }

        let word = trimmed.split_whitespace().next().unwrap_or(trimmed);
        let word = word.split('@').next().unwrap_or(word).to_lowercase();

        let command = match word.as_str() {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/status" => Command::Status,
            "/restart" => Command::Restart,
            "/stop" => Command::Stop,
            "/getprofile" => Command::GetProfile,
            "/getsummary" => Command::GetSummary,
            _ => Command::Unknown(word),
        };
        Input::Command(command)
    }
}
