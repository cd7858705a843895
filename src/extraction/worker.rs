//! Tracked background extraction jobs.
//!
//! Each completed interview becomes one job. Jobs run detached from the
//! event that finished the interview; their outcome comes back as an
//! [`ExtractionReport`] on a channel so nothing is silently lost.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::interview::InterviewResult;
use crate::llm::LlmProvider;
use crate::metrics::Metrics;
use crate::storage::ProfileStore;

use super::pipeline::ProfileExtractor;
use super::presentation::{ProfileMatch, infer_archetype};

/// A completed interview waiting for profile extraction.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    /// Where to deliver the report.
    pub chat_id: String,
    pub interview: InterviewResult,
}

/// How an extraction job ended.
#[derive(Debug, Clone)]
pub enum ExtractionReport {
    Completed {
        chat_id: String,
        interview_id: Uuid,
        profile_json: String,
        path: PathBuf,
        /// `None` when archetype matching is disabled.
        archetype: Option<Result<ProfileMatch, String>>,
    },
    Failed {
        chat_id: String,
        interview_id: Uuid,
        reason: String,
        missing_fields: Vec<String>,
    },
}

impl ExtractionReport {
    pub fn chat_id(&self) -> &str {
        match self {
            Self::Completed { chat_id, .. } | Self::Failed { chat_id, .. } => chat_id,
        }
    }
}

/// Runs extraction jobs on a tracked task set.
pub struct ExtractionWorker {
    extractor: Arc<ProfileExtractor>,
    store: ProfileStore,
    archetype_llm: Option<Arc<dyn LlmProvider>>,
    metrics: Arc<Metrics>,
    reports: mpsc::UnboundedSender<ExtractionReport>,
    tasks: Mutex<JoinSet<()>>,
}

impl ExtractionWorker {
    /// Create a worker and the receiving end of its report channel.
    pub fn new(
        extractor: Arc<ProfileExtractor>,
        store: ProfileStore,
        archetype_llm: Option<Arc<dyn LlmProvider>>,
        metrics: Arc<Metrics>,
    ) -> (Self, mpsc::UnboundedReceiver<ExtractionReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                extractor,
                store,
                archetype_llm,
                metrics,
                reports: tx,
                tasks: Mutex::new(JoinSet::new()),
            },
            rx,
        )
    }

    pub fn extractor(&self) -> &Arc<ProfileExtractor> {
        &self.extractor
    }

    /// Start a job. Returns immediately.
    pub async fn submit(&self, job: ExtractionJob) {
        let extractor = Arc::clone(&self.extractor);
        let store = self.store.clone();
        let archetype_llm = self.archetype_llm.clone();
        let metrics = Arc::clone(&self.metrics);
        let reports = self.reports.clone();

        tracing::info!(
            interview_id = %job.interview.interview_id,
            chat_id = %job.chat_id,
            "Extraction job submitted"
        );

        let mut tasks = self.tasks.lock().await;
        // Reap finished jobs so the set does not grow.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let report = run_job(job, &extractor, &store, archetype_llm.as_deref(), &metrics).await;
            if reports.send(report).is_err() {
                tracing::warn!("Extraction report dropped, receiver closed");
            }
        });
    }

    /// Jobs still running.
    pub async fn in_flight(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait up to `grace` for running jobs, then abort the rest. Returns how
    /// many were aborted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut tasks = self.tasks.lock().await;
        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_ok() {
            return 0;
        }
        let remaining = tasks.len();
        tracing::warn!(remaining, "Aborting extraction jobs after grace period");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        remaining
    }
}

async fn run_job(
    job: ExtractionJob,
    extractor: &ProfileExtractor,
    store: &ProfileStore,
    archetype_llm: Option<&dyn LlmProvider>,
    metrics: &Metrics,
) -> ExtractionReport {
    let interview_id = job.interview.interview_id;
    let result = extractor.extract(&job.interview).await;

    if !result.success {
        metrics.profile_failed();
        return ExtractionReport::Failed {
            chat_id: job.chat_id,
            interview_id,
            reason: result
                .error
                .unwrap_or_else(|| "unknown extraction error".to_string()),
            missing_fields: result.missing_fields,
        };
    }

    let path = match store.save_profile(interview_id, &result.profile_json).await {
        Ok(path) => path,
        Err(e) => {
            metrics.profile_failed();
            tracing::error!(interview_id = %interview_id, error = %e, "Failed to save profile");
            return ExtractionReport::Failed {
                chat_id: job.chat_id,
                interview_id,
                reason: format!("profile could not be saved: {e}"),
                missing_fields: Vec::new(),
            };
        }
    };

    let archetype = match archetype_llm {
        Some(llm) => Some(
            infer_archetype(llm, &result.profile_json)
                .await
                .map_err(|e| {
                    tracing::warn!(interview_id = %interview_id, error = %e, "Archetype match failed");
                    e.to_string()
                }),
        ),
        None => None,
    };

    metrics.profile_generated();
    ExtractionReport::Completed {
        chat_id: job.chat_id,
        interview_id,
        profile_json: result.profile_json,
        path,
        archetype,
    }
}
