//! Process-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters shared by the dispatcher, the generator wrapper and the
/// extraction worker.
#[derive(Debug, Default)]
pub struct Metrics {
    interviews_started: AtomicU64,
    interviews_completed: AtomicU64,
    questions_asked: AtomicU64,
    profiles_generated: AtomicU64,
    profiles_failed: AtomicU64,
    generator_calls: AtomicU64,
    generator_failures: AtomicU64,
    rate_limited: AtomicU64,
    answers_rejected: AtomicU64,
}

/// Point-in-time copy of [`Metrics`], for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub interviews_started: u64,
    pub interviews_completed: u64,
    pub questions_asked: u64,
    pub profiles_generated: u64,
    pub profiles_failed: u64,
    pub generator_calls: u64,
    pub generator_failures: u64,
    pub rate_limited: u64,
    pub answers_rejected: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interview_started(&self) {
        self.interviews_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn interview_completed(&self) {
        self.interviews_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn questions_asked(&self, count: u64) {
        self.questions_asked.fetch_add(count, Ordering::Relaxed);
    }

    pub fn profile_generated(&self) {
        self.profiles_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn profile_failed(&self) {
        self.profiles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generator_call(&self, success: bool) {
        self.generator_calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.generator_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn answer_rejected(&self) {
        self.answers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interviews_started: self.interviews_started.load(Ordering::Relaxed),
            interviews_completed: self.interviews_completed.load(Ordering::Relaxed),
            questions_asked: self.questions_asked.load(Ordering::Relaxed),
            profiles_generated: self.profiles_generated.load(Ordering::Relaxed),
            profiles_failed: self.profiles_failed.load(Ordering::Relaxed),
            generator_calls: self.generator_calls.load(Ordering::Relaxed),
            generator_failures: self.generator_failures.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            answers_rejected: self.answers_rejected.load(Ordering::Relaxed),
        }
    }
}
