//! Human-readable views of a generated profile.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExtractionError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::json::parse_object;
use super::prompts::{EXTRACTION_SYSTEM, archetype_prompt};

/// Scalar fields shown at the top of a summary, with their labels.
const SUMMARY_SCALARS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("age", "Age"),
    ("current_city", "City"),
    ("university", "University"),
    ("current_position", "Position"),
];

const LIST_PREVIEW: usize = 3;

/// Render a short summary of a serialized profile.
pub fn summarize_profile(profile_json: &str) -> Result<String, ExtractionError> {
    let record: Map<String, Value> = serde_json::from_str(profile_json)?;
    Ok(summarize_record(&record))
}

pub fn summarize_record(record: &Map<String, Value>) -> String {
    let mut lines = Vec::new();

    for (key, label) in SUMMARY_SCALARS {
        if let Some(text) = record.get(*key).and_then(scalar_text) {
            lines.push(format!("{label}: {text}"));
        }
    }

    for (key, value) in record {
        if key.starts_with('_') {
            continue;
        }
        let Some(items) = value.as_array() else {
            continue;
        };
        let shown: Vec<String> = items
            .iter()
            .filter_map(scalar_text)
            .take(LIST_PREVIEW)
            .collect();
        if shown.is_empty() {
            continue;
        }
        let ellipsis = if items.len() > LIST_PREVIEW { ", …" } else { "" };
        lines.push(format!("{}: {}{ellipsis}", humanize(key), shown.join(", ")));
    }

    if lines.is_empty() {
        return "The profile has no summary fields yet.".to_string();
    }
    lines.join("\n")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Personality archetype matched to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMatch {
    #[serde(rename = "profile_match.id")]
    pub id: String,
    #[serde(rename = "profile_match.name")]
    pub name: String,
    #[serde(rename = "profile_match.summary")]
    pub summary: String,
}

/// Ask the generator which archetype fits the profile best.
pub async fn infer_archetype(
    llm: &dyn LlmProvider,
    profile_json: &str,
) -> Result<ProfileMatch, ExtractionError> {
    let request = CompletionRequest::new(vec![
        ChatMessage::system(EXTRACTION_SYSTEM),
        ChatMessage::user(archetype_prompt(profile_json)),
    ])
    .with_temperature(0.3)
    .with_max_tokens(600);

    let response = llm.complete(request).await?;
    let map = parse_object(&response.content).map_err(ExtractionError::MalformedResponse)?;
    parse_profile_match(map)
}

/// Accepts both the dotted keys and a nested `profile_match` object.
fn parse_profile_match(mut map: Map<String, Value>) -> Result<ProfileMatch, ExtractionError> {
    if let Some(Value::Object(nested)) = map.remove("profile_match") {
        for (key, value) in nested {
            map.entry(format!("profile_match.{key}")).or_insert(value);
        }
    }
    serde_json::from_value(Value::Object(map))
        .map_err(|e| ExtractionError::MalformedResponse(format!("archetype response: {e}")))
}

/// One-paragraph description of a matched archetype.
pub fn describe_archetype(matched: &ProfileMatch) -> String {
    format!(
        "Your archetype: {} ({})\n\n{}",
        matched.name.trim(),
        matched.id.trim(),
        matched.summary.trim()
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::llm::testing::ScriptedLlm;

    #[test]
    fn summary_lists_priority_scalars_then_arrays() {
        let profile = json!({
            "name": "Ivan Petrov",
            "age": 30,
            "university": "",
            "current_position": "Backend engineer",
            "hobbies": ["chess", "running", "guitar", "cooking"],
            "hard_skills": ["Rust"],
            "values": [],
            "_metadata": {"interview_id": "x"}
        });
        let summary = summarize_profile(&profile.to_string()).unwrap();

        assert!(summary.starts_with("Name: Ivan Petrov\nAge: 30\nPosition: Backend engineer"));
        assert!(!summary.contains("University"));
        assert!(summary.contains("Hobbies: chess, running, guitar, …"));
        assert!(summary.contains("Hard skills: Rust"));
        assert!(!summary.contains("Values"));
        assert!(!summary.contains("metadata"));
    }

    #[test]
    fn summary_of_empty_profile() {
        assert_eq!(
            summarize_profile("{}").unwrap(),
            "The profile has no summary fields yet."
        );
        assert!(summarize_profile("not json").is_err());
    }

    #[tokio::test]
    async fn archetype_from_dotted_keys() {
        let llm = ScriptedLlm::new([r#"{"profile_match.id": "sage", "profile_match.name": "The Sage", "profile_match.summary": "Seeks truth."}"#]);
        let matched = infer_archetype(&llm, "{}").await.unwrap();
        assert_eq!(matched.id, "sage");
        assert_eq!(
            describe_archetype(&matched),
            "Your archetype: The Sage (sage)\n\nSeeks truth."
        );
    }

    #[tokio::test]
    async fn archetype_from_nested_object() {
        let llm = Arc::new(ScriptedLlm::new([
            "```json\n{\"profile_match\": {\"id\": \"hero\", \"name\": \"The Hero\", \"summary\": \"Brave.\"}}\n```",
        ]));
        let matched = infer_archetype(llm.as_ref(), "{}").await.unwrap();
        assert_eq!(matched.name, "The Hero");
    }

    #[tokio::test]
    async fn archetype_missing_keys_is_malformed() {
        let llm = ScriptedLlm::new([r#"{"profile_match.id": "x"}"#]);
        let err = infer_archetype(&llm, "{}").await.unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse(_)));
    }
}
