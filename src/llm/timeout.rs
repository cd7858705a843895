//! Deadline wrapper for generator calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::metrics::Metrics;

/// Wraps a provider so every call either finishes within `timeout` or fails
/// with [`LlmError::Timeout`]. Calls are counted when metrics are attached.
pub struct TimeoutProvider {
    inner: Arc<dyn LlmProvider>,
    timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl LlmProvider for TimeoutProvider {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let result = match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    model = self.inner.model_name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Generator call timed out"
                );
                Err(LlmError::Timeout {
                    provider: self.inner.model_name().to_string(),
                    timeout: self.timeout,
                })
            }
        };

        if let Some(ref metrics) = self.metrics {
            metrics.generator_call(result.is_ok());
        }
        result
    }
}
