//! Session bookkeeping: per-user admission control and the session registry.

pub mod rate_limit;
pub mod registry;

pub use rate_limit::RateLimiter;
pub use registry::{SessionHandle, SessionRegistry, spawn_sweep_task};
