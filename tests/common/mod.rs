//! Shared fixtures for integration tests: a stub generator that answers by
//! prompt kind, a channel that records what it sends, and a bot wired from
//! both.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use interview_bot::bot::{BotDeps, InterviewBot};
use interview_bot::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use interview_bot::error::{ChannelError, LlmError};
use interview_bot::extraction::{ExtractionReport, ExtractionWorker, ProfileExtractor};
use interview_bot::interview::{
    Block, InterviewConfig, InterviewMachine, InterviewSettings, LlmBlockSummarizer,
    LlmQuestionSource, QuestionSource, SchemaField, StaticQuestionSource,
};
use interview_bot::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use interview_bot::metrics::Metrics;
use interview_bot::session::{RateLimiter, SessionRegistry};
use interview_bot::storage::ProfileStore;

/// Maximum time any test is allowed to wait before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const PROFILE: &str = r#"{"name": "Ivan Petrov", "age": 30, "current_city": "Omsk", "hobbies": ["chess", "running"]}"#;

/// Stub generator. Replies depend on which prompt it was given.
#[derive(Default)]
pub struct StubLlm {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StubLlm {
    /// Make every call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: "upstream unavailable".into(),
            });
        }

        let prompt: String = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let reply = if prompt.contains("experienced analyst") {
            "The person shared concrete facts about themselves.".to_string()
        } else if prompt.contains("archetype") {
            r#"{"profile_match.id": "sage", "profile_match.name": "The Sage", "profile_match.summary": "Curious and reflective."}"#.to_string()
        } else if prompt.contains("Build a user profile") {
            format!("```json\n{PROFILE}\n```")
        } else if prompt.contains("could not be filled") {
            "{}".to_string()
        } else {
            "Could you tell me a bit more about that?".to_string()
        };
        Ok(CompletionResponse::text(reply))
    }
}

/// Records everything sent through it.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn send(&self, chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), response.content));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

pub fn block(id: usize, questions: &[&str]) -> Block {
    Block {
        id,
        name: format!("block{id}"),
        title: format!("Block {id}"),
        context_prompt: format!("Topic {id}"),
        focus_areas: vec![],
        questions: questions.iter().map(|q| q.to_string()).collect(),
    }
}

pub fn interview_config(
    per_block: i64,
    followups: i64,
    blocks: Vec<Block>,
) -> Arc<InterviewConfig> {
    Arc::new(InterviewConfig {
        settings: InterviewSettings {
            total_blocks: blocks.len() as i64,
            questions_per_block: per_block,
            max_followup_questions: followups,
        },
        blocks,
    })
}

pub fn schema() -> Arc<Vec<SchemaField>> {
    Arc::new(vec![
        SchemaField::scalar("name", "string"),
        SchemaField::scalar("age", "integer"),
        SchemaField::scalar("current_city", "string"),
        SchemaField::array("hobbies"),
    ])
}

pub struct Harness {
    pub bot: Arc<InterviewBot>,
    pub registry: Arc<SessionRegistry>,
    pub store: ProfileStore,
    pub llm: Arc<StubLlm>,
    pub channel: Arc<RecordingChannel>,
    pub metrics: Arc<Metrics>,
    pub reports: mpsc::UnboundedReceiver<ExtractionReport>,
}

pub struct HarnessOptions {
    pub config: Arc<InterviewConfig>,
    pub generative: bool,
    pub rate_limit: usize,
}

impl HarnessOptions {
    pub fn new(config: Arc<InterviewConfig>) -> Self {
        Self {
            config,
            generative: false,
            rate_limit: 100,
        }
    }
}

pub fn harness(dir: &Path, options: HarnessOptions) -> Harness {
    let llm = Arc::new(StubLlm::default());
    let metrics = Arc::new(Metrics::new());
    let registry = Arc::new(SessionRegistry::new());
    let store = ProfileStore::new(dir.join("results"), dir.join("output"));

    let questions: Arc<dyn QuestionSource> = if options.generative {
        Arc::new(LlmQuestionSource::new(llm.clone()))
    } else {
        Arc::new(StaticQuestionSource)
    };
    let machine = InterviewMachine::new(
        options.config,
        questions,
        Arc::new(LlmBlockSummarizer::new(llm.clone(), 500)),
    );

    let archetype: Arc<dyn LlmProvider> = llm.clone();
    let (worker, reports) = ExtractionWorker::new(
        Arc::new(ProfileExtractor::new(llm.clone(), schema())),
        store.clone(),
        Some(archetype),
        Arc::clone(&metrics),
    );

    let channel = Arc::new(RecordingChannel::default());
    let bot = Arc::new(InterviewBot::new(
        BotDeps {
            machine: Arc::new(machine),
            registry: Arc::clone(&registry),
            limiter: Arc::new(RateLimiter::new(
                options.rate_limit,
                Duration::from_secs(60),
            )),
            store: store.clone(),
            worker: Arc::new(worker),
            metrics: Arc::clone(&metrics),
        },
        channel.clone(),
    ));

    Harness {
        bot,
        registry,
        store,
        llm,
        channel,
        metrics,
        reports,
    }
}

pub fn message(sender: &str, text: &str) -> IncomingMessage {
    IncomingMessage::new("test", sender, text)
}
