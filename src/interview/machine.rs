//! Interview state machine: sequences blocks and questions for one session.
//!
//! Every transition runs on a working copy of the session and is committed
//! only when all generator calls succeeded, so a failed question or summary
//! leaves the session exactly as it was and the user can simply resend.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::InterviewError;

use super::model::{BlockResult, InterviewConfig, InterviewResult, QuestionAnswer};
use super::questions::{QuestionContext, QuestionSource};
use super::state::{Session, SessionState};
use super::summarizer::BlockSummarizer;
use super::validation::validate_answer;

/// Something the machine wants said to the user. Rendering is up to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Welcome {
        interview_id: Uuid,
        total_blocks: usize,
        question_budget: usize,
    },
    BlockIntro {
        block_id: usize,
        total_blocks: usize,
        title: String,
    },
    Question(String),
    BlockFinished {
        block_id: usize,
        title: String,
    },
    Completed {
        interview_id: Uuid,
    },
    Stopped,
    NotRunning,
    Reset,
}

/// Outcome of a committed transition.
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub replies: Vec<Reply>,
    /// Set once, on the transition that finished the last block.
    pub completed: Option<InterviewResult>,
}

impl Transition {
    fn say(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            completed: None,
        }
    }
}

/// Read-only view of a session's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: SessionState,
    pub interview_id: Option<Uuid>,
    pub current_block: usize,
    pub total_blocks: usize,
    pub block_title: Option<String>,
    pub questions_asked: usize,
    pub question_budget: usize,
}

/// Drives sessions through the configured blocks.
pub struct InterviewMachine {
    config: Arc<InterviewConfig>,
    questions: Arc<dyn QuestionSource>,
    summarizer: Arc<dyn BlockSummarizer>,
}

impl InterviewMachine {
    pub fn new(
        config: Arc<InterviewConfig>,
        questions: Arc<dyn QuestionSource>,
        summarizer: Arc<dyn BlockSummarizer>,
    ) -> Self {
        Self {
            config,
            questions,
            summarizer,
        }
    }

    pub fn config(&self) -> &InterviewConfig {
        &self.config
    }

    /// Begin a new run: welcome, block 1, first question.
    ///
    /// Refused while a run is underway. From `Completed` the old run is
    /// discarded.
    pub async fn start(&self, session: &mut Session) -> Result<Transition, InterviewError> {
        if session.state.is_active() {
            return Err(InterviewError::AlreadyInProgress);
        }

        let mut draft = session.clone();
        draft.reset();
        let interview_id = Uuid::new_v4();
        draft.interview_id = Some(interview_id);
        draft.result = Some(InterviewResult::new(interview_id));
        draft.current_block = 1;
        draft.transition_to(SessionState::Interview)?;

        let mut transition = Transition::say(Reply::Welcome {
            interview_id,
            total_blocks: self.config.total_blocks(),
            question_budget: self.config.question_budget(),
        });
        self.begin_block(&mut draft, &mut transition).await?;

        tracing::info!(
            sender = %draft.identity,
            interview_id = %interview_id,
            "Interview started"
        );
        draft.touch();
        *session = draft;
        Ok(transition)
    }

    /// Record an answer to the pending question and move on.
    pub async fn answer(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<Transition, InterviewError> {
        if session.state != SessionState::WaitingAnswer {
            return Err(InterviewError::NotAwaitingAnswer);
        }
        validate_answer(text)?;

        let mut draft = session.clone();
        match draft.dialogue.last_mut() {
            Some(pending) if pending.answer.is_empty() => pending.answer = text.trim().to_string(),
            _ => return Err(InterviewError::NotAwaitingAnswer),
        }
        draft.questions_asked += 1;
        draft.transition_to(SessionState::Interview)?;

        let mut transition = Transition::default();
        if draft.questions_asked < self.config.question_budget() {
            let block = self
                .config
                .block(draft.current_block)
                .ok_or(InterviewError::UnknownBlock(draft.current_block))?;
            let next = self
                .questions
                .next_question(QuestionContext {
                    config: &self.config,
                    block,
                    summaries: &draft.summaries,
                    dialogue: &draft.dialogue,
                    asked: draft.questions_asked,
                })
                .await
                .map_err(InterviewError::QuestionGeneration)?;

            if !next.block_complete {
                draft.dialogue.push(QuestionAnswer::pending(&next.text));
                draft.transition_to(SessionState::WaitingAnswer)?;
                transition.replies.push(Reply::Question(next.text));
                draft.touch();
                *session = draft;
                return Ok(transition);
            }
        }

        self.finish_block(&mut draft, &mut transition).await?;
        draft.touch();
        *session = draft;
        Ok(transition)
    }

    /// Abandon the current run without saving anything.
    pub fn stop(&self, session: &mut Session) -> Transition {
        if !session.state.can_transition_to(SessionState::Idle) {
            return Transition::say(Reply::NotRunning);
        }
        tracing::info!(sender = %session.identity, state = %session.state, "Interview stopped");
        session.reset();
        Transition::say(Reply::Stopped)
    }

    /// Reset to `Idle` from any state.
    pub fn restart(&self, session: &mut Session) -> Transition {
        session.reset();
        Transition::say(Reply::Reset)
    }

    pub fn status(&self, session: &Session) -> StatusReport {
        StatusReport {
            state: session.state,
            interview_id: session.interview_id,
            current_block: session.current_block,
            total_blocks: self.config.total_blocks(),
            block_title: self
                .config
                .block(session.current_block)
                .map(|b| b.title.clone()),
            questions_asked: session.questions_asked,
            question_budget: self.config.question_budget(),
        }
    }

    /// Open `draft.current_block` and ask its first question.
    async fn begin_block(
        &self,
        draft: &mut Session,
        transition: &mut Transition,
    ) -> Result<(), InterviewError> {
        let block_id = draft.current_block;
        let block = self
            .config
            .block(block_id)
            .ok_or(InterviewError::UnknownBlock(block_id))?;

        draft.questions_asked = 0;
        draft.dialogue.clear();

        let first = self
            .questions
            .next_question(QuestionContext {
                config: &self.config,
                block,
                summaries: &draft.summaries,
                dialogue: &draft.dialogue,
                asked: 0,
            })
            .await
            .map_err(InterviewError::QuestionGeneration)?;

        if first.block_complete {
            return Err(InterviewError::EmptyBlock { block_id });
        }

        transition.replies.push(Reply::BlockIntro {
            block_id,
            total_blocks: self.config.total_blocks(),
            title: block.title.clone(),
        });
        transition.replies.push(Reply::Question(first.text.clone()));
        draft.dialogue.push(QuestionAnswer::pending(first.text));
        draft.transition_to(SessionState::WaitingAnswer)?;
        Ok(())
    }

    /// Summarize and record the current block, then open the next one or
    /// complete the run.
    async fn finish_block(
        &self,
        draft: &mut Session,
        transition: &mut Transition,
    ) -> Result<(), InterviewError> {
        let block_id = draft.current_block;
        let block = self
            .config
            .block(block_id)
            .ok_or(InterviewError::UnknownBlock(block_id))?;

        let summary = self
            .summarizer
            .summarize(block, &draft.dialogue)
            .await
            .map_err(InterviewError::Summary)?;

        let block_result = BlockResult {
            block_id,
            block_name: block.name.clone(),
            questions_and_answers: std::mem::take(&mut draft.dialogue),
        };
        let interview_id = draft.interview_id.unwrap_or_else(Uuid::new_v4);
        draft
            .result
            .get_or_insert_with(|| InterviewResult::new(interview_id))
            .blocks
            .push(block_result);
        draft.summaries.push(summary);
        draft.questions_asked = 0;

        tracing::info!(
            sender = %draft.identity,
            block = block_id,
            "Block finished"
        );
        transition.replies.push(Reply::BlockFinished {
            block_id,
            title: block.title.clone(),
        });

        draft.current_block += 1;
        if draft.current_block > self.config.total_blocks() {
            draft.transition_to(SessionState::Completed)?;
            let result = draft.result.clone();
            if let Some(ref r) = result {
                transition.replies.push(Reply::Completed {
                    interview_id: r.interview_id,
                });
                tracing::info!(
                    sender = %draft.identity,
                    interview_id = %r.interview_id,
                    blocks = r.blocks.len(),
                    "Interview completed"
                );
            }
            transition.completed = result;
            return Ok(());
        }

        self.begin_block(draft, transition).await
    }
}
