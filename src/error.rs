//! Error types for the interview bot.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::interview::SessionState;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Interview error: {0}")]
    Interview(#[from] InterviewError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid interview configuration: {0}")]
    Validation(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Persistence errors for interview results and profiles.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} not found for interview {id}")]
    NotFound { kind: &'static str, id: Uuid },
}

/// Why an answer was refused by the input gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputRejection {
    #[error("the message is empty")]
    Empty,

    #[error("the message is too long ({length} characters, maximum {max})")]
    TooLong { length: usize, max: usize },

    #[error("the message contains too many repeated characters")]
    Repetitive,
}

/// Interview state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("An interview is already in progress")]
    AlreadyInProgress,

    #[error("No question is waiting for an answer")]
    NotAwaitingAnswer,

    #[error("Answer rejected: {0}")]
    InvalidInput(#[from] InputRejection),

    #[error("Question generation failed: {0}")]
    QuestionGeneration(#[source] LlmError),

    #[error("Block summary failed: {0}")]
    Summary(#[source] LlmError),

    #[error("Block {block_id} produced no questions")]
    EmptyBlock { block_id: usize },

    #[error("Block {0} is not configured")]
    UnknownBlock(usize),

    #[error("Cannot move session from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

/// Profile extraction pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction call failed: {0}")]
    Generator(#[from] LlmError),

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("Profile incomplete, unfilled fields: {}", missing.join(", "))]
    IncompleteProfile { missing: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
