//! Per-user session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InterviewError;

use super::model::{InterviewResult, QuestionAnswer};

/// The four states of an interview session.
///
/// Progresses: Idle → Interview → WaitingAnswer → Completed. `Interview` is
/// the working state while a question or summary is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Interview,
    WaitingAnswer,
    Completed,
}

impl SessionState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, Interview)
                | (Completed, Interview)
                | (Interview, WaitingAnswer)
                | (Interview, Completed)
                | (WaitingAnswer, Interview)
                | (Interview, Idle)
                | (WaitingAnswer, Idle)
                | (Completed, Idle)
        )
    }

    /// Whether an interview run is underway.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Interview | Self::WaitingAnswer)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Interview => "interview",
            Self::WaitingAnswer => "waiting_answer",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// One user's interview session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub identity: String,
    pub state: SessionState,
    pub interview_id: Option<Uuid>,
    /// 1-based index of the current block; 0 when idle, one past the last
    /// block once completed.
    pub current_block: usize,
    /// Answered questions in the current block.
    pub questions_asked: usize,
    /// Current block's dialogue. The last entry may be pending.
    pub dialogue: Vec<QuestionAnswer>,
    /// One summary per finished block, in order.
    pub summaries: Vec<String>,
    pub result: Option<InterviewResult>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            state: SessionState::Idle,
            interview_id: None,
            current_block: 0,
            questions_asked: 0,
            dialogue: Vec::new(),
            summaries: Vec::new(),
            result: None,
            last_activity: Utc::now(),
        }
    }

    /// Back to `Idle`, discarding all progress. Identity is kept.
    pub fn reset(&mut self) {
        let identity = std::mem::take(&mut self.identity);
        *self = Self::new(identity);
    }

    /// Move to `target`, refusing moves outside the transition table.
    pub fn transition_to(&mut self, target: SessionState) -> Result<(), InterviewError> {
        if !self.state.can_transition_to(target) {
            return Err(InterviewError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// The question currently awaiting an answer.
    pub fn pending_question(&self) -> Option<&str> {
        match self.dialogue.last() {
            Some(qa) if self.state == SessionState::WaitingAnswer && qa.answer.is_empty() => {
                Some(&qa.question)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use SessionState::*;
        for (from, to) in [
            (Idle, Interview),
            (Interview, WaitingAnswer),
            (WaitingAnswer, Interview),
            (Interview, Completed),
            (Completed, Interview),
            (WaitingAnswer, Idle),
        ] {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use SessionState::*;
        assert!(!Idle.can_transition_to(WaitingAnswer));
        assert!(!Idle.can_transition_to(Completed));
        assert!(!WaitingAnswer.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(WaitingAnswer));
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn transition_to_refuses_illegal_moves() {
        let mut session = Session::new("7");
        let err = session
            .transition_to(SessionState::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition {
                from: SessionState::Idle,
                to: SessionState::Completed
            }
        ));
        assert_eq!(session.state, SessionState::Idle);

        session.transition_to(SessionState::Interview).unwrap();
        session.transition_to(SessionState::WaitingAnswer).unwrap();
        assert_eq!(session.state, SessionState::WaitingAnswer);
    }

    #[test]
    fn display_matches_serde() {
        use SessionState::*;
        for state in [Idle, Interview, WaitingAnswer, Completed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{state}\""), json);
        }
    }

    #[test]
    fn reset_keeps_identity_only() {
        let mut session = Session::new("42");
        session.state = SessionState::WaitingAnswer;
        session.interview_id = Some(Uuid::new_v4());
        session.current_block = 2;
        session.questions_asked = 1;
        session.dialogue.push(QuestionAnswer::pending("q"));
        session.summaries.push("s".into());

        session.reset();
        assert_eq!(session.identity, "42");
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.interview_id.is_none());
        assert_eq!(session.current_block, 0);
        assert_eq!(session.questions_asked, 0);
        assert!(session.dialogue.is_empty());
        assert!(session.summaries.is_empty());
    }

    #[test]
    fn pending_question_only_while_waiting() {
        let mut session = Session::new("1");
        session.dialogue.push(QuestionAnswer::pending("How are you?"));
        assert!(session.pending_question().is_none());
        session.state = SessionState::WaitingAnswer;
        assert_eq!(session.pending_question(), Some("How are you?"));
    }
}
