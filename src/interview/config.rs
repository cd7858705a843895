//! Loading and validation of the interview and profile-schema YAML files.

use std::path::Path;

use serde_yaml::Value;

use crate::error::ConfigError;
use crate::interview::model::{InterviewConfig, SchemaField};

/// Read and validate the interview configuration.
pub fn load_interview_config(path: &Path) -> Result<InterviewConfig, ConfigError> {
    let raw = read(path)?;
    parse_interview_config(&raw, path)
}

/// Parse and validate interview configuration text. `path` is only used in
/// error messages.
pub fn parse_interview_config(raw: &str, path: &Path) -> Result<InterviewConfig, ConfigError> {
    let config: InterviewConfig =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate(&config)?;
    Ok(config)
}

/// Check block counts, ids and required text fields.
pub fn validate(config: &InterviewConfig) -> Result<(), ConfigError> {
    let settings = &config.settings;
    if settings.total_blocks <= 0 {
        return Err(ConfigError::Validation(
            "total_blocks must be greater than 0".to_string(),
        ));
    }
    if settings.questions_per_block <= 0 {
        return Err(ConfigError::Validation(
            "questions_per_block must be greater than 0".to_string(),
        ));
    }
    if settings.max_followup_questions < 0 {
        return Err(ConfigError::Validation(
            "max_followup_questions cannot be negative".to_string(),
        ));
    }
    if config.blocks.len() as i64 != settings.total_blocks {
        return Err(ConfigError::Validation(format!(
            "found {} blocks but total_blocks is {}",
            config.blocks.len(),
            settings.total_blocks
        )));
    }

    for (idx, block) in config.blocks.iter().enumerate() {
        let expected = idx + 1;
        if block.id != expected {
            return Err(ConfigError::Validation(format!(
                "block at position {expected} has id {}, expected {expected}",
                block.id
            )));
        }
        for (field, value) in [
            ("name", &block.name),
            ("title", &block.title),
            ("context_prompt", &block.context_prompt),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "block {} must have a non-empty {field}",
                    block.id
                )));
            }
        }
        if block.questions.iter().all(|q| q.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "block {} must have at least one question",
                block.id
            )));
        }
    }

    Ok(())
}

/// Read the profile schema.
pub fn load_schema(path: &Path) -> Result<Vec<SchemaField>, ConfigError> {
    let raw = read(path)?;
    parse_schema(&raw, path)
}

/// Parse a profile schema: a top-level mapping of field name to a type
/// string (`string`, `integer`, `array`, `object`, `string[]`), a sequence
/// (array field) or a mapping (object field). Field order is preserved.
pub fn parse_schema(raw: &str, path: &Path) -> Result<Vec<SchemaField>, ConfigError> {
    let parse_err = |reason: String| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason,
    };

    let doc: Value = serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string()))?;
    let Value::Mapping(map) = doc else {
        return Err(parse_err("schema must be a mapping of field names".to_string()));
    };

    let mut fields = Vec::with_capacity(map.len());
    for (key, value) in map {
        let Some(name) = key.as_str().map(str::to_string) else {
            return Err(parse_err(format!("non-string field name: {key:?}")));
        };
        let field = match value {
            Value::Sequence(_) => SchemaField::array(name),
            Value::Mapping(_) => SchemaField::object(name),
            Value::String(ty) => {
                let ty = ty.trim().to_ascii_lowercase();
                if ty == "array" || ty.ends_with("[]") {
                    SchemaField {
                        field_type: ty,
                        ..SchemaField::array(name)
                    }
                } else if ty == "object" {
                    SchemaField::object(name)
                } else {
                    SchemaField::scalar(name, ty)
                }
            }
            Value::Null => SchemaField::scalar(name, "string"),
            Value::Bool(_) => SchemaField::scalar(name, "boolean"),
            Value::Number(_) => SchemaField::scalar(name, "number"),
            Value::Tagged(_) => {
                return Err(parse_err(format!("unsupported tagged value for {name}")));
            }
        };
        fields.push(field);
    }

    if fields.is_empty() {
        return Err(parse_err("schema has no fields".to_string()));
    }
    Ok(fields)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
