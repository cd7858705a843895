//! The dispatcher: routes inbound messages to commands or to the interview
//! state machine and sends the replies back.

pub mod commands;
pub mod messages;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::error::{Error, InterviewError, StorageError};
use crate::extraction::{ExtractionJob, ExtractionReport, ExtractionWorker, summarize_profile};
use crate::interview::{InterviewMachine, Reply, Session, SessionState, Transition};
use crate::metrics::Metrics;
use crate::session::{RateLimiter, SessionRegistry, spawn_sweep_task};
use crate::storage::ProfileStore;

pub use commands::{Command, Input};

/// Shared components the bot is built from.
pub struct BotDeps {
    pub machine: Arc<InterviewMachine>,
    pub registry: Arc<SessionRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub store: ProfileStore,
    pub worker: Arc<ExtractionWorker>,
    pub metrics: Arc<Metrics>,
}

/// Background intervals and shutdown behaviour for [`InterviewBot::run`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    /// How long to wait for in-flight work before aborting it.
    pub shutdown_grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(3600),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

pub struct InterviewBot {
    deps: BotDeps,
    channel: Arc<dyn Channel>,
}

impl InterviewBot {
    pub fn new(deps: BotDeps, channel: Arc<dyn Channel>) -> Self {
        Self { deps, channel }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.deps.metrics
    }

    // ── Main loop ───────────────────────────────────────────────────

    /// Read messages until the channel closes or Ctrl+C, one task per
    /// message, then shut everything down.
    pub async fn run(
        self: Arc<Self>,
        reports: mpsc::UnboundedReceiver<ExtractionReport>,
        options: RunOptions,
    ) -> Result<(), Error> {
        let mut message_stream = self.channel.start().await?;

        let sweep_handle = spawn_sweep_task(
            Arc::clone(&self.deps.registry),
            Arc::clone(&self.deps.limiter),
            options.sweep_interval,
            options.session_ttl,
        );
        let forwarder = spawn_report_forwarder(Arc::clone(&self.channel), reports);
        let mut handlers = JoinSet::new();

        tracing::info!(channel = self.channel.name(), "Interview bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            while handlers.try_join_next().is_some() {}
            let bot = Arc::clone(&self);
            handlers.spawn(async move { bot.handle(&message).await });
        }

        // Cleanup
        tracing::info!("Interview bot shutting down...");
        sweep_handle.abort();

        let drained = tokio::time::timeout(options.shutdown_grace, async {
            while handlers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(remaining = handlers.len(), "Aborting message handlers");
            handlers.abort_all();
        }

        let aborted = self.deps.worker.shutdown(options.shutdown_grace).await;
        forwarder.abort();

        tracing::info!(
            extraction_jobs_aborted = aborted,
            metrics = ?self.deps.metrics.snapshot(),
            "Shutdown complete"
        );
        self.channel.shutdown().await?;
        Ok(())
    }

    /// Process one message and send every reply to its chat.
    pub async fn handle(&self, message: &IncomingMessage) {
        tracing::debug!(
            sender = %message.sender_id,
            channel = %message.channel,
            chars = message.content.chars().count(),
            "Received message"
        );

        for text in self.process(message).await {
            if let Err(e) = self
                .channel
                .respond(message, OutgoingResponse::text(text))
                .await
            {
                tracing::error!(sender = %message.sender_id, error = %e, "Failed to send reply");
                break;
            }
        }
    }

    // ── Message dispatch ────────────────────────────────────────────

    /// Apply one message to its sender's session and return the replies.
    ///
    /// The session lock is held for the whole message, generator calls
    /// included, so one user's messages are handled strictly in order.
    pub async fn process(&self, message: &IncomingMessage) -> Vec<String> {
        let sender = message.sender_id.as_str();
        if !self.deps.limiter.allow(sender) {
            self.deps.metrics.rate_limited();
            tracing::warn!(sender, "Rate limit exceeded");
            return vec![messages::RATE_LIMITED.to_string()];
        }

        let handle = self.deps.registry.get_or_create(sender).await;
        let mut session = handle.lock().await;
        session.touch();

        match Input::parse(&message.content) {
            Input::Command(command) => self.command(command, &mut session, message).await,
            Input::Answer(text) => self.answer(&mut session, &text, message).await,
        }
    }

    async fn command(
        &self,
        command: Command,
        session: &mut Session,
        message: &IncomingMessage,
    ) -> Vec<String> {
        let machine = &self.deps.machine;
        match command {
            Command::Start => match machine.start(session).await {
                Ok(transition) => {
                    self.deps.metrics.interview_started();
                    self.apply(transition, &message.chat_id).await
                }
                Err(e) => {
                    tracing::warn!(sender = %session.identity, error = %e, "Start refused");
                    vec![messages::interview_error_text(&e)]
                }
            },
            Command::Help => vec![messages::help_text(machine.config())],
            Command::Status => vec![messages::status_text(&machine.status(session))],
            Command::Restart => self.apply(machine.restart(session), &message.chat_id).await,
            Command::Stop => self.apply(machine.stop(session), &message.chat_id).await,
            Command::GetProfile => {
                if session.state != SessionState::Completed {
                    return vec![messages::PROFILE_NOT_READY.to_string()];
                }
                match self.profile_json(session).await {
                    Ok(json) => match session.interview_id {
                        Some(id) => messages::profile_messages(id, &json),
                        None => vec![messages::PROFILE_NOT_READY.to_string()],
                    },
                    Err(text) => vec![text],
                }
            }
            Command::GetSummary => {
                if session.state != SessionState::Completed {
                    return vec![messages::SUMMARY_NOT_READY.to_string()];
                }
                match self.profile_json(session).await {
                    Ok(json) => match summarize_profile(&json) {
                        Ok(summary) => vec![messages::summary_message(&summary)],
                        Err(e) => vec![format!("❌ Could not build the summary: {e}")],
                    },
                    Err(text) => vec![text],
                }
            }
            Command::Unknown(name) => {
                tracing::debug!(command = %name, "Unknown command");
                vec![messages::UNKNOWN_COMMAND.to_string()]
            }
        }
    }

    async fn answer(
        &self,
        session: &mut Session,
        text: &str,
        message: &IncomingMessage,
    ) -> Vec<String> {
        match self.deps.machine.answer(session, text).await {
            Ok(transition) => self.apply(transition, &message.chat_id).await,
            Err(e) => {
                if matches!(e, InterviewError::InvalidInput(_)) {
                    self.deps.metrics.answer_rejected();
                    tracing::debug!(sender = %session.identity, error = %e, "Answer rejected");
                } else {
                    tracing::warn!(sender = %session.identity, error = %e, "Answer not processed");
                }
                vec![messages::interview_error_text(&e)]
            }
        }
    }

    /// Render a committed transition. A finished interview is persisted and
    /// handed to the extraction worker.
    async fn apply(&self, transition: Transition, chat_id: &str) -> Vec<String> {
        let asked = transition
            .replies
            .iter()
            .filter(|r| matches!(r, Reply::Question(_)))
            .count();
        if asked > 0 {
            self.deps.metrics.questions_asked(asked as u64);
        }

        let mut out: Vec<String> = transition
            .replies
            .iter()
            .map(messages::render_reply)
            .collect();

        let Some(result) = transition.completed else {
            return out;
        };

        self.deps.metrics.interview_completed();
        match self.deps.store.save_result(&result).await {
            Ok(path) => {
                tracing::info!(
                    interview_id = %result.interview_id,
                    path = %path.display(),
                    "Interview result saved"
                );
            }
            Err(e) => {
                tracing::error!(
                    interview_id = %result.interview_id,
                    error = %e,
                    "Failed to save interview result"
                );
                out.push(messages::SAVE_FAILED.to_string());
            }
        }
        out.push(messages::completion_text(&result));

        self.deps
            .worker
            .submit(ExtractionJob {
                chat_id: chat_id.to_string(),
                interview: result,
            })
            .await;
        out
    }

    /// Find the profile for a completed session: cache, then disk, then a
    /// fresh extraction. The error is a message for the user.
    async fn profile_json(&self, session: &Session) -> Result<String, String> {
        let Some(interview_id) = session.interview_id else {
            return Err(messages::PROFILE_NOT_READY.to_string());
        };
        let extractor = self.deps.worker.extractor();

        if let Some(json) = extractor.cached(interview_id).await {
            return Ok(json);
        }

        match self.deps.store.load_profile(interview_id).await {
            Ok(json) => return Ok(json),
            Err(StorageError::NotFound { .. }) => {}
            Err(e) => {
                tracing::warn!(interview_id = %interview_id, error = %e, "Stored profile unreadable");
            }
        }

        let interview = match &session.result {
            Some(result) => result.clone(),
            None => self
                .deps
                .store
                .load_result(interview_id)
                .await
                .map_err(|e| format!("❌ Profile not found: {e}"))?,
        };

        tracing::info!(interview_id = %interview_id, "No stored profile, extracting again");
        let result = extractor.extract(&interview).await;
        if !result.success {
            self.deps.metrics.profile_failed();
            return Err(format!(
                "❌ Could not analyse the profile: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        self.deps.metrics.profile_generated();

        if let Err(e) = self
            .deps
            .store
            .save_profile(interview_id, &result.profile_json)
            .await
        {
            tracing::warn!(interview_id = %interview_id, error = %e, "Failed to save profile");
        }
        Ok(result.profile_json)
    }
}

/// Deliver extraction reports to the chats they belong to.
pub fn spawn_report_forwarder(
    channel: Arc<dyn Channel>,
    mut reports: mpsc::UnboundedReceiver<ExtractionReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            for text in messages::report_messages(&report) {
                if let Err(e) = channel
                    .send(report.chat_id(), OutgoingResponse::text(text))
                    .await
                {
                    tracing::error!(
                        chat_id = report.chat_id(),
                        error = %e,
                        "Failed to deliver extraction report"
                    );
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::channels::MessageStream;
    use crate::error::ChannelError;
    use crate::extraction::ProfileExtractor;
    use crate::interview::{
        Block, InterviewConfig, InterviewResult, InterviewSettings, LlmBlockSummarizer,
        SchemaField, StaticQuestionSource,
    };
    use crate::llm::testing::ScriptedLlm;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn send(
            &self,
            chat_id: &str,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
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

    struct Fixture {
        bot: InterviewBot,
        channel: Arc<RecordingChannel>,
        reports: mpsc::UnboundedReceiver<ExtractionReport>,
        llm: Arc<ScriptedLlm>,
        _dir: tempfile::TempDir,
    }

    fn fixture(rate_limit: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let config = Arc::new(InterviewConfig {
            settings: InterviewSettings {
                total_blocks: 1,
                questions_per_block: 1,
                max_followup_questions: 0,
            },
            blocks: vec![Block {
                id: 1,
                name: "intro".into(),
                title: "Introduction".into(),
                context_prompt: "Get to know the person".into(),
                focus_areas: vec![],
                questions: vec!["What is your name?".into()],
            }],
        });
        let machine = InterviewMachine::new(
            config,
            Arc::new(StaticQuestionSource),
            Arc::new(LlmBlockSummarizer::new(llm.clone(), 500)),
        );
        let metrics = Arc::new(Metrics::new());
        let store = ProfileStore::new(dir.path().join("results"), dir.path().join("output"));
        let extractor = ProfileExtractor::new(
            llm.clone(),
            Arc::new(vec![SchemaField::scalar("name", "string")]),
        );
        let (worker, reports) = ExtractionWorker::new(
            Arc::new(extractor),
            store.clone(),
            None,
            Arc::clone(&metrics),
        );
        let channel = Arc::new(RecordingChannel::default());
        let bot = InterviewBot::new(
            BotDeps {
                machine: Arc::new(machine),
                registry: Arc::new(SessionRegistry::new()),
                limiter: Arc::new(RateLimiter::new(rate_limit, Duration::from_secs(60))),
                store,
                worker: Arc::new(worker),
                metrics,
            },
            channel.clone(),
        );
        Fixture {
            bot,
            channel,
            reports,
            llm,
            _dir: dir,
        }
    }

    fn msg(text: &str) -> IncomingMessage {
        IncomingMessage::new("test", "42", text)
    }

    #[tokio::test]
    async fn rate_limit_rejects_without_touching_session() {
        let f = fixture(1);
        let replies = f.bot.process(&msg("/start")).await;
        assert_eq!(replies.len(), 3);

        let replies = f.bot.process(&msg("Ivan")).await;
        assert_eq!(replies, vec![messages::RATE_LIMITED]);
        assert_eq!(f.bot.metrics().snapshot().rate_limited, 1);

        let handle = f.bot.deps.registry.get("42").await.unwrap();
        assert_eq!(handle.lock().await.state, SessionState::WaitingAnswer);
    }

    #[tokio::test]
    async fn profile_commands_need_completion() {
        let f = fixture(10);
        assert_eq!(
            f.bot.process(&msg("/getprofile")).await,
            vec![messages::PROFILE_NOT_READY]
        );
        assert_eq!(
            f.bot.process(&msg("/getsummary")).await,
            vec![messages::SUMMARY_NOT_READY]
        );
        assert_eq!(
            f.bot.process(&msg("/nope")).await,
            vec![messages::UNKNOWN_COMMAND]
        );
        assert_eq!(
            f.bot.process(&msg("/stop")).await,
            vec![messages::NOT_RUNNING]
        );
    }

    #[tokio::test]
    async fn answer_outside_interview_gets_hint() {
        let f = fixture(10);
        let replies = f.bot.process(&msg("hello")).await;
        assert!(replies[0].contains("/start"));
    }

    #[tokio::test]
    async fn completion_persists_and_submits_extraction() {
        let mut f = fixture(10);
        f.llm.push_ok("Summary of the intro block.");
        f.llm.push_ok(r#"{"name": "Ivan"}"#);

        f.bot.process(&msg("/start")).await;
        let replies = f.bot.process(&msg("Ivan")).await;
        assert!(replies.iter().any(|r| r.contains("Interview finished")));

        let handle = f.bot.deps.registry.get("42").await.unwrap();
        let interview_id = {
            let session = handle.lock().await;
            assert_eq!(session.state, SessionState::Completed);
            session.interview_id.unwrap()
        };
        let saved = f.bot.deps.store.load_result(interview_id).await.unwrap();
        assert_eq!(saved.blocks.len(), 1);

        let report = f.reports.recv().await.unwrap();
        assert!(matches!(report, ExtractionReport::Completed { .. }));
        assert_eq!(report.chat_id(), "42");

        // The profile now comes from the extractor cache.
        let replies = f.bot.process(&msg("/getprofile")).await;
        assert!(replies[0].contains("\"name\": \"Ivan\""));
        let replies = f.bot.process(&msg("/getsummary")).await;
        assert!(replies[0].contains("Name: Ivan"));
        assert_eq!(f.llm.call_count(), 2);
    }

    #[tokio::test]
    async fn getprofile_reextracts_when_nothing_stored() {
        let f = fixture(10);
        let result = InterviewResult::new(Uuid::new_v4());
        {
            let handle = f.bot.deps.registry.get_or_create("42").await;
            let mut session = handle.lock().await;
            session.state = SessionState::Completed;
            session.interview_id = Some(result.interview_id);
            session.result = Some(result.clone());
        }
        f.llm.push_ok(r#"{"name": "Anna"}"#);

        let replies = f.bot.process(&msg("/getprofile")).await;
        assert!(replies[0].contains("Anna"));
        assert!(f.bot.deps.store.profile_path(result.interview_id).exists());
    }

    #[tokio::test]
    async fn forwarder_sends_report_to_its_chat() {
        let f = fixture(10);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_report_forwarder(f.channel.clone(), rx);
        tx.send(ExtractionReport::Failed {
            chat_id: "-100".into(),
            interview_id: Uuid::nil(),
            reason: "boom".into(),
            missing_fields: vec![],
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let sent = f.channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "-100");
        assert!(sent[0].1.contains("boom"));
    }
}
