//! The interview itself: configuration, session state, question sources,
//! block summaries and the state machine tying them together.

pub mod config;
pub mod machine;
pub mod model;
pub mod prompts;
pub mod questions;
pub mod state;
pub mod summarizer;
pub mod validation;

pub use machine::{InterviewMachine, Reply, StatusReport, Transition};
pub use model::{
    Block, BlockResult, InterviewConfig, InterviewResult, InterviewSettings, QuestionAnswer,
    SchemaField,
};
pub use questions::{LlmQuestionSource, NextQuestion, QuestionSource, StaticQuestionSource};
pub use state::{Session, SessionState};
pub use summarizer::{BlockSummarizer, LlmBlockSummarizer};
