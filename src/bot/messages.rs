//! User-facing text. Everything the bot says is rendered here.

use uuid::Uuid;

use crate::error::InterviewError;
use crate::extraction::{ExtractionReport, describe_archetype, summarize_profile};
use crate::interview::{InterviewConfig, InterviewResult, Reply, SessionState, StatusReport};

/// Long payloads are cut into parts of at most this many characters.
pub const CHUNK_CHARS: usize = 3500;

/// Rough time per block quoted in the welcome text, in minutes.
const MINUTES_PER_BLOCK: usize = 3;

pub const RATE_LIMITED: &str = "⏳ Too many messages. Please wait a minute.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help to see the list of commands.";
pub const RESET: &str = "🔄 Interview reset. Use /start to begin a new interview.";
pub const STOPPED: &str = "🛑 Interview stopped.";
pub const NOT_RUNNING: &str = "The interview is not running.";
pub const NOT_STARTED: &str = "The interview has not started. Use /start to begin.";
pub const PROFILE_NOT_READY: &str = "❌ The profile is only available after the interview is \
     complete. Use /start to begin a new interview.";
pub const SUMMARY_NOT_READY: &str = "❌ The summary is only available after the interview is \
     complete. Use /start to begin a new interview.";
pub const SAVE_FAILED: &str = "⚠️ The interview is complete, but its result could not be saved.";

pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Welcome {
            interview_id,
            total_blocks,
            question_budget,
        } => format!(
            "🎯 *Welcome to the interview!*\n\n\
             🆔 *Interview ID:* `{interview_id}`\n\
             📋 *Blocks:* {total_blocks}\n\
             ❓ *Questions per block:* up to {question_budget}\n\
             ⏱ *Time:* ~{minutes} minutes\n\n\
             *Rules:*\n\
             • Answer honestly and in detail\n\
             • Use /status to check your progress\n\
             • Use /stop to stop\n\n\
             The first block starts now! 🚀",
            minutes = total_blocks * MINUTES_PER_BLOCK,
        ),
        Reply::BlockIntro {
            block_id,
            total_blocks,
            title,
        } => format!("📋 *Block {block_id}/{total_blocks}: {title}*"),
        Reply::Question(text) => format!("❓ {text}"),
        Reply::BlockFinished { block_id, title } => {
            format!("✅ Block {block_id} ({title}) complete!")
        }
        Reply::Completed { .. } => {
            "🎉 Interview complete! Starting the analysis of your profile...".to_string()
        }
        Reply::Stopped => STOPPED.to_string(),
        Reply::NotRunning => NOT_RUNNING.to_string(),
        Reply::Reset => RESET.to_string(),
    }
}

/// Sent after the last block, once the result is saved.
pub fn completion_text(result: &InterviewResult) -> String {
    format!(
        "✅ *Interview finished!*\n\
         📊 Collected:\n\
         • {blocks} blocks completed\n\
         • {answers} answers received\n\
         • 🆔 ID: `{id}`\n\n\
         🧠 Profile analysis is in progress and will be ready in a minute or two.\n\n\
         Use /start for a new interview.",
        blocks = result.blocks.len(),
        answers = result.answered_questions(),
        id = result.interview_id,
    )
}

pub fn status_text(status: &StatusReport) -> String {
    let id = status
        .interview_id
        .map(|id| id.to_string())
        .unwrap_or_default();
    match status.state {
        SessionState::Idle => NOT_STARTED.to_string(),
        SessionState::Completed => format!(
            "✅ Interview complete!\n🆔 ID: `{id}`\n\n\
             _Use /getprofile for the JSON profile_"
        ),
        SessionState::Interview | SessionState::WaitingAnswer => format!(
            "📊 *Interview progress*\n\n\
             🆔 ID: `{id}`\n\
             📋 Block: {current}/{total} ({title})\n\
             ❓ Questions in block: {asked}/{budget}\n\
             ⏰ State: {state}",
            current = status.current_block,
            total = status.total_blocks,
            title = status.block_title.as_deref().unwrap_or("unknown block"),
            asked = status.questions_asked,
            budget = status.question_budget,
            state = state_label(status.state),
        ),
    }
}

fn state_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "Idle",
        SessionState::Interview => "Interview",
        SessionState::WaitingAnswer => "Waiting for your answer",
        SessionState::Completed => "Completed",
    }
}

pub fn help_text(config: &InterviewConfig) -> String {
    format!(
        "🤖 *Interview bot with profile analysis*\n\n\
         *Commands:*\n\
         /start - Start a new interview\n\
         /status - Check the progress of the current interview\n\
         /restart - Reset the interview\n\
         /stop - Stop the current interview\n\
         /getprofile - Get the full JSON profile (after completion)\n\
         /getsummary - Get a short profile summary (after completion)\n\
         /help - Show this message\n\n\
         *How it works:*\n\
         1. Use /start to begin\n\
         2. Answer the questions as honestly and fully as you can\n\
         3. The interview has {blocks} blocks\n\
         4. Each block has up to {budget} questions\n\
         5. When you finish, a profile is built from your answers\n\n\
         *Tip:* the more detail you give, the more accurate the analysis!",
        blocks = config.total_blocks(),
        budget = config.question_budget(),
    )
}

/// What to tell the user when a transition was refused or failed.
pub fn interview_error_text(error: &InterviewError) -> String {
    match error {
        InterviewError::AlreadyInProgress => "You already have an interview in progress. \
             Use /status to check progress or /restart to start over."
            .to_string(),
        InterviewError::NotAwaitingAnswer => "Now is not the time for answers. \
             Use /start to begin an interview or /help for help."
            .to_string(),
        InterviewError::InvalidInput(rejection) => {
            format!("❌ Answer rejected: {rejection}. Please try again.")
        }
        InterviewError::QuestionGeneration(_) => "⚠️ Could not prepare the next question. \
             Nothing was lost; please send your last message again."
            .to_string(),
        InterviewError::Summary(_) => "⚠️ Could not finish the block. \
             Nothing was lost; please send your last message again."
            .to_string(),
        InterviewError::EmptyBlock { .. }
        | InterviewError::UnknownBlock(_)
        | InterviewError::InvalidTransition { .. } => {
            format!("❌ The interview is misconfigured: {error}")
        }
    }
}

/// Messages announcing the outcome of a background extraction job.
pub fn report_messages(report: &ExtractionReport) -> Vec<String> {
    match report {
        ExtractionReport::Failed {
            reason,
            missing_fields,
            ..
        } => {
            let mut text = format!("❌ Could not analyse the profile: {reason}");
            if !missing_fields.is_empty() {
                text.push_str(&format!(
                    "\n\nFields still missing: {}",
                    missing_fields.join(", ")
                ));
            }
            vec![text]
        }
        ExtractionReport::Completed {
            interview_id,
            profile_json,
            path,
            archetype,
            ..
        } => {
            let summary = summarize_profile(profile_json).unwrap_or_else(|_| {
                "The profile was created, but its summary could not be generated.".to_string()
            });
            let mut messages = vec![format!(
                "🎯 *Profile analysis complete!*\n\n{summary}\n\n\
                 💾 Full profile saved to: `{path}`\n\n\
                 _This analysis was generated from your answers by an AI model._",
                path = path.display(),
            )];
            messages.extend(profile_messages(*interview_id, profile_json));
            match archetype {
                Some(Ok(matched)) => messages.push(describe_archetype(matched)),
                Some(Err(reason)) => {
                    messages.push(format!("⚠️ Could not determine an archetype: {reason}"))
                }
                None => {}
            }
            messages
        }
    }
}

/// The profile JSON as one message, or as numbered parts when long.
pub fn profile_messages(interview_id: Uuid, profile_json: &str) -> Vec<String> {
    let chunks = chunk_text(profile_json, CHUNK_CHARS);
    if chunks.len() == 1 {
        return vec![format!(
            "📄 *Full JSON profile:*\n\n```json\n{profile_json}\n```"
        )];
    }

    let total = chunks.len();
    let mut messages = vec!["📄 *Full JSON profile (large, sending in parts):*".to_string()];
    for (i, chunk) in chunks.iter().enumerate() {
        messages.push(format!(
            "📄 *Part {}/{total}:*\n\n```json\n{chunk}\n```",
            i + 1
        ));
    }
    messages.push(format!(
        "✅ JSON profile sent in full. Interview ID: `{interview_id}`"
    ));
    messages
}

pub fn summary_message(summary: &str) -> String {
    format!("🎯 *Short profile summary:*\n\n{summary}")
}

/// Cut `text` into pieces of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::{InputRejection, LlmError};
    use crate::extraction::ProfileMatch;

    #[test]
    fn welcome_mentions_id_and_budget() {
        let id = Uuid::new_v4();
        let text = render_reply(&Reply::Welcome {
            interview_id: id,
            total_blocks: 4,
            question_budget: 6,
        });
        assert!(text.contains(&id.to_string()));
        assert!(text.contains("*Blocks:* 4"));
        assert!(text.contains("up to 6"));
        assert!(text.contains("~12 minutes"));
    }

    #[test]
    fn status_for_each_state() {
        let mut status = StatusReport {
            state: SessionState::Idle,
            interview_id: None,
            current_block: 0,
            total_blocks: 3,
            block_title: None,
            questions_asked: 0,
            question_budget: 5,
        };
        assert_eq!(status_text(&status), NOT_STARTED);

        status.state = SessionState::WaitingAnswer;
        status.interview_id = Some(Uuid::nil());
        status.current_block = 2;
        status.block_title = Some("Family".into());
        status.questions_asked = 1;
        let text = status_text(&status);
        assert!(text.contains("Block: 2/3 (Family)"));
        assert!(text.contains("Questions in block: 1/5"));
        assert!(text.contains("Waiting for your answer"));

        status.state = SessionState::Completed;
        assert!(status_text(&status).contains("/getprofile"));
    }

    #[test]
    fn errors_become_hints() {
        let text = interview_error_text(&InterviewError::InvalidInput(InputRejection::TooLong {
            length: 5000,
            max: 4000,
        }));
        assert!(text.contains("5000"));

        let text = interview_error_text(&InterviewError::QuestionGeneration(
            LlmError::InvalidRequest("x".into()),
        ));
        assert!(text.contains("send your last message again"));
        assert!(interview_error_text(&InterviewError::AlreadyInProgress).contains("/restart"));
    }

    #[test]
    fn short_profile_is_one_message() {
        let messages = profile_messages(Uuid::nil(), "{\"name\": \"Ivan\"}");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("```json\n{\"name\": \"Ivan\"}\n```"));
    }

    #[test]
    fn long_profile_is_sent_in_numbered_parts() {
        let json = format!("{{\"bio\": \"{}\"}}", "x".repeat(8000));
        let messages = profile_messages(Uuid::nil(), &json);
        // header, three parts, footer
        assert_eq!(messages.len(), 5);
        assert!(messages[1].starts_with("📄 *Part 1/3:*"));
        assert!(messages[3].starts_with("📄 *Part 3/3:*"));
    }

    #[test]
    fn chunking_is_character_based() {
        let chunks = chunk_text(&"ж".repeat(7), 3);
        assert_eq!(chunks, vec!["жжж", "жжж", "ж"]);
        assert_eq!(chunk_text("", 3), vec![""]);
    }

    #[test]
    fn completed_report_includes_summary_json_and_archetype() {
        let report = ExtractionReport::Completed {
            chat_id: "1".into(),
            interview_id: Uuid::nil(),
            profile_json: "{\"name\": \"Ivan\"}".into(),
            path: PathBuf::from("output/profile_x.json"),
            archetype: Some(Ok(ProfileMatch {
                id: "sage".into(),
                name: "The Sage".into(),
                summary: "Wise.".into(),
            })),
        };
        let messages = report_messages(&report);
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("Name: Ivan"));
        assert!(messages[0].contains("output/profile_x.json"));
        assert!(messages[1].contains("```json"));
        assert!(messages[2].starts_with("Your archetype: The Sage (sage)"));
    }

    #[test]
    fn failed_report_lists_missing_fields() {
        let report = ExtractionReport::Failed {
            chat_id: "1".into(),
            interview_id: Uuid::nil(),
            reason: "incomplete".into(),
            missing_fields: vec!["city".into(), "age".into()],
        };
        let messages = report_messages(&report);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with("Fields still missing: city, age"));
    }
}
