//! Interview bot: block-by-block conversational interviews with
//! post-interview profile extraction.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod extraction;
pub mod interview;
pub mod llm;
pub mod metrics;
pub mod session;
pub mod storage;
