//! Pull a JSON object out of free-form model output.

use serde_json::{Map, Value};

/// Extract the JSON object text from a response that may be wrapped in a
/// markdown fence or surrounded by prose.
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}

/// Parse a response into a JSON object, or describe why it is not one.
pub fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    let candidate = extract_json_object(text);
    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_direct() {
        let input = r#"{"name": "Ivan"}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_json_from_markdown() {
        let input = "Here is the profile:\n```json\n{\"name\": \"Ivan\"}\n```\n";
        assert_eq!(extract_json_object(input), "{\"name\": \"Ivan\"}");
    }

    #[test]
    fn extract_json_from_bare_fence() {
        let input = "```\n{\"age\": 30}\n```";
        assert_eq!(extract_json_object(input), "{\"age\": 30}");
    }

    #[test]
    fn extract_json_with_surrounding_text() {
        let input = "Sure! {\"city\": \"Omsk\", \"tags\": {\"a\": 1}} hope that helps";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
        assert!(parse_object(input).is_ok());
    }

    #[test]
    fn parse_object_rejects_non_objects() {
        assert!(parse_object("[1, 2, 3]").unwrap_err().contains("array"));
        assert!(parse_object("I could not find anything").is_err());
        assert!(parse_object("{\"name\": ").is_err());
    }
}
