//! Post-interview profile extraction.

pub mod json;
pub mod merge;
pub mod pipeline;
pub mod presentation;
pub mod prompts;
pub mod worker;

pub use pipeline::{ProfileExtractor, ProfileResult};
pub use presentation::{ProfileMatch, describe_archetype, infer_archetype, summarize_profile};
pub use worker::{ExtractionJob, ExtractionReport, ExtractionWorker};
