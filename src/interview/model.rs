//! Interview data model: configured blocks and recorded results.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question with the user's answer. The answer is empty while the
/// question is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

impl QuestionAnswer {
    pub fn pending(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: String::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }
}

/// The recorded dialogue of one finished block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResult {
    pub block_id: usize,
    pub block_name: String,
    pub questions_and_answers: Vec<QuestionAnswer>,
}

/// Everything collected during one interview run.
///
/// Created when the interview starts, grows by one [`BlockResult`] per
/// finished block and is persisted once on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewResult {
    pub interview_id: Uuid,
    /// RFC 3339 start time.
    pub timestamp: String,
    pub blocks: Vec<BlockResult>,
}

impl InterviewResult {
    pub fn new(interview_id: Uuid) -> Self {
        Self {
            interview_id,
            timestamp: Utc::now().to_rfc3339(),
            blocks: Vec::new(),
        }
    }

    pub fn total_questions(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.questions_and_answers.len())
            .sum()
    }

    pub fn answered_questions(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| &b.questions_and_answers)
            .filter(|qa| qa.is_answered())
            .count()
    }

    /// Share of answered questions, in percent.
    pub fn completion_rate(&self) -> f64 {
        let total = self.total_questions();
        if total == 0 {
            return 0.0;
        }
        self.answered_questions() as f64 / total as f64 * 100.0
    }

    /// Flatten to plain text, blocks in order and Q/A in order.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&format!("## Block {}: {}\n", block.block_id, block.block_name));
            for qa in &block.questions_and_answers {
                out.push_str(&format!("Q: {}\nA: {}\n", qa.question, qa.answer));
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

/// A topical block of the interview, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: usize,
    pub name: String,
    pub title: String,
    pub context_prompt: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Global interview tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSettings {
    pub total_blocks: i64,
    pub questions_per_block: i64,
    #[serde(default)]
    pub max_followup_questions: i64,
}

/// Validated interview configuration: settings plus the ordered blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewConfig {
    #[serde(rename = "interview_config")]
    pub settings: InterviewSettings,
    pub blocks: Vec<Block>,
}

impl InterviewConfig {
    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Maximum questions per block: base questions plus follow-ups.
    pub fn question_budget(&self) -> usize {
        let total = self
            .settings
            .questions_per_block
            .saturating_add(self.settings.max_followup_questions);
        usize::try_from(total).unwrap_or(if total < 0 { 0 } else { usize::MAX })
    }

    /// Block by 1-based id.
    pub fn block(&self, id: usize) -> Option<&Block> {
        id.checked_sub(1).and_then(|idx| self.blocks.get(idx))
    }
}

/// One field of the profile schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub is_array: bool,
    pub is_object: bool,
}

impl SchemaField {
    pub fn scalar(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            is_array: false,
            is_object: false,
        }
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: "array".to_string(),
            is_array: true,
            is_object: false,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: "object".to_string(),
            is_array: false,
            is_object: true,
        }
    }
}
