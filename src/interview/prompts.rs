//! Prompts for generated questions and block summaries.

use super::model::{Block, InterviewConfig, QuestionAnswer};

/// Marker the model appends when it has covered the block.
pub const BLOCK_COMPLETE_MARKER: &str = "[BLOCK_COMPLETE]";

/// Build the system prompt for the interviewer in the given block.
///
/// Carries the question budget, the block's strategy and focus areas, and the
/// summaries of all earlier blocks so questions can build on them.
pub fn question_system_prompt(
    config: &InterviewConfig,
    block: &Block,
    summaries: &[String],
    asked: usize,
) -> String {
    let budget = config.question_budget();
    let base = config.settings.questions_per_block;
    let followups = config.settings.max_followup_questions;

    let mut prompt = String::from(
        "You are an experienced interviewer. Your task is to learn as much as possible \
         about the person in front of you, one question at a time.\n\n",
    );

    prompt.push_str("HARD LIMITS:\n");
    prompt.push_str(&format!(
        "- At most {budget} questions in this block ({base} base + {followups} follow-up)\n"
    ));
    prompt.push_str("- Every question should draw out as much useful information as possible\n");
    prompt.push_str("- Use in-depth interviewing techniques\n\n");

    prompt.push_str(&format!(
        "CURRENT BLOCK: \"{}\" ({}/{})\n\n",
        block.title,
        block.id,
        config.total_blocks()
    ));

    if !summaries.is_empty() {
        prompt.push_str("CONTEXT FROM EARLIER BLOCKS:\n");
        for (i, summary) in summaries.iter().enumerate() {
            prompt.push_str(&format!("Block {}: {}\n", i + 1, summary));
        }
        prompt.push('\n');
    }

    prompt.push_str("YOUR STRATEGY:\n");
    prompt.push_str(&block.context_prompt);
    prompt.push_str("\n\n");

    if !block.focus_areas.is_empty() {
        prompt.push_str("MAKE SURE TO COVER:\n");
        for area in &block.focus_areas {
            prompt.push_str(&format!("- {area}\n"));
        }
        prompt.push('\n');
    }

    if !block.questions.is_empty() {
        prompt.push_str("BASE QUESTIONS (adapt them to what you already know):\n");
        for question in &block.questions {
            prompt.push_str(&format!("- {question}\n"));
        }
        prompt.push('\n');
    }

    if asked < base.max(0) as usize {
        prompt.push_str(&format!(
            "This is base question {} of {base}.\n",
            asked + 1
        ));
    } else {
        prompt.push_str(&format!(
            "Base questions are done. This would be follow-up question {} of {followups}; \
             only ask it if an earlier answer needs clarifying.\n",
            asked + 1 - base.max(0) as usize
        ));
    }

    prompt.push_str(
        "\nSTYLE: Professional but warm. Build an atmosphere of trust. \
         Reply with the question text only, one question at a time, and never mention \
         block numbers.\n",
    );
    prompt.push_str(&format!(
        "When the block is covered, reply with only {BLOCK_COMPLETE_MARKER}."
    ));

    prompt
}

/// Build the summary prompt for a finished block.
pub fn summary_prompt(block: &Block, dialogue: &[QuestionAnswer]) -> String {
    let mut prompt = format!(
        "You are an experienced analyst. Review the finished interview block \
         \"{}\" and write a structured summary.\n\nQUESTIONS AND ANSWERS:\n",
        block.title
    );

    for (i, qa) in dialogue.iter().enumerate() {
        prompt.push_str(&format!("{}. Question: {}\n", i + 1, qa.question));
        prompt.push_str(&format!("   Answer: {}\n\n", qa.answer));
    }

    prompt.push_str(
        "TASK: Extract as much information as possible that will help in the next \
         interview blocks.\n\n\
         WRITE A SHORT FREE-FORM SUMMARY COVERING:\n\
         - Key facts about the person\n\
         - Important themes and priorities\n\
         - Emotional reactions and sensitive areas\n\
         - Behaviour patterns and values\n\n\
         Be specific and avoid generic phrases.",
    );

    prompt
}
