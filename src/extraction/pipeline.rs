//! Single-pass profile extraction with a bounded retry-fill loop.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::interview::{InterviewResult, SchemaField};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::json::parse_object;
use super::merge::{merge_missing, missing_fields};
use super::prompts::{EXTRACTION_SYSTEM, extraction_prompt, fill_prompt};

/// Default number of retry-fill rounds.
pub const DEFAULT_FILL_ATTEMPTS: usize = 2;

const EXTRACTION_TEMPERATURE: f32 = 0.1;
const EXTRACTION_MAX_TOKENS: u32 = 4000;

/// Outcome of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResult {
    /// Pretty-printed profile with `_metadata`. Empty on failure.
    pub profile_json: String,
    pub metadata: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields still unfilled when extraction gave up.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

/// Turns a finished interview into a schema-complete profile.
pub struct ProfileExtractor {
    llm: Arc<dyn LlmProvider>,
    schema: Arc<Vec<SchemaField>>,
    max_fill_attempts: usize,
    /// Latest successful profile per interview.
    cache: RwLock<HashMap<Uuid, String>>,
}

impl ProfileExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, schema: Arc<Vec<SchemaField>>) -> Self {
        Self {
            llm,
            schema,
            max_fill_attempts: DEFAULT_FILL_ATTEMPTS,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_max_fill_attempts(mut self, attempts: usize) -> Self {
        self.max_fill_attempts = attempts;
        self
    }

    pub fn schema(&self) -> &[SchemaField] {
        &self.schema
    }

    /// The last profile produced for `interview_id`, if any.
    pub async fn cached(&self, interview_id: Uuid) -> Option<String> {
        self.cache.read().await.get(&interview_id).cloned()
    }

    /// Run the pipeline. Never fails outright; failures are reported in the
    /// returned [`ProfileResult`].
    pub async fn extract(&self, interview: &InterviewResult) -> ProfileResult {
        let interview_id = interview.interview_id;
        tracing::info!(
            interview_id = %interview_id,
            questions = interview.total_questions(),
            "Extracting profile"
        );

        match self.try_extract(interview).await {
            Ok((profile_json, metadata)) => {
                self.cache
                    .write()
                    .await
                    .insert(interview_id, profile_json.clone());
                tracing::info!(interview_id = %interview_id, "Profile extracted");
                ProfileResult {
                    profile_json,
                    metadata,
                    success: true,
                    error: None,
                    missing_fields: Vec::new(),
                }
            }
            Err(e) => {
                let missing_fields = match &e {
                    ExtractionError::IncompleteProfile { missing } => missing.clone(),
                    _ => Vec::new(),
                };
                tracing::warn!(
                    interview_id = %interview_id,
                    error = %e,
                    missing = ?missing_fields,
                    "Profile extraction failed"
                );
                ProfileResult {
                    profile_json: String::new(),
                    metadata: Value::Object(base_metadata(interview)),
                    success: false,
                    error: Some(e.to_string()),
                    missing_fields,
                }
            }
        }
    }

    async fn try_extract(
        &self,
        interview: &InterviewResult,
    ) -> Result<(String, Value), ExtractionError> {
        let transcript = interview.transcript();

        let response = self
            .call(extraction_prompt(&self.schema, &transcript))
            .await?;
        let mut record = parse_object(&response).map_err(ExtractionError::MalformedResponse)?;

        let mut missing = missing_fields(&self.schema, &record);
        let mut attempts = 0;
        while !missing.is_empty() && attempts < self.max_fill_attempts {
            attempts += 1;
            tracing::debug!(
                interview_id = %interview.interview_id,
                attempt = attempts,
                missing = ?missing,
                "Retry-fill"
            );

            let response = self
                .call(fill_prompt(&self.schema, &missing, &transcript))
                .await?;
            match parse_object(&response) {
                Ok(partial) => {
                    merge_missing(&mut record, &partial, &missing);
                }
                Err(reason) => {
                    tracing::warn!(
                        interview_id = %interview.interview_id,
                        attempt = attempts,
                        reason = %reason,
                        "Malformed fill response, nothing merged"
                    );
                }
            }
            missing = missing_fields(&self.schema, &record);
        }

        if !missing.is_empty() {
            return Err(ExtractionError::IncompleteProfile { missing });
        }

        let mut metadata = base_metadata(interview);
        metadata.insert("fill_attempts".to_string(), json!(attempts));
        record.insert("_metadata".to_string(), Value::Object(metadata.clone()));

        let profile_json = serde_json::to_string_pretty(&Value::Object(record))?;
        Ok((profile_json, Value::Object(metadata)))
    }

    async fn call(&self, prompt: String) -> Result<String, ExtractionError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(EXTRACTION_SYSTEM),
            ChatMessage::user(prompt),
        ])
        .with_temperature(EXTRACTION_TEMPERATURE)
        .with_max_tokens(EXTRACTION_MAX_TOKENS);
        Ok(self.llm.complete(request).await?.content)
    }
}

fn base_metadata(interview: &InterviewResult) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("interview_id".into(), json!(interview.interview_id));
    metadata.insert(
        "creation_date".into(),
        json!(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    metadata.insert("total_questions".into(), json!(interview.total_questions()));
    metadata.insert(
        "answered_questions".into(),
        json!(interview.answered_questions()),
    );
    metadata.insert(
        "completion_rate".into(),
        json!((interview.completion_rate() * 10.0).round() / 10.0),
    );
    metadata
}
