//! Concurrent map from user identity to interview session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::interview::Session;

use super::rate_limit::RateLimiter;

/// Shared handle to one session. Holding the lock serializes all work on
/// that session.
pub type SessionHandle = Arc<Mutex<Session>>;

struct SessionSlot {
    session: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// Owns every live session.
///
/// The map lock is held only for lookups; per-session work happens under the
/// session's own mutex so distinct users proceed concurrently.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session for `identity`, creating an idle one on first access.
    pub async fn get_or_create(&self, identity: &str) -> SessionHandle {
        self.get_or_create_at(identity, Utc::now()).await
    }

    pub async fn get_or_create_at(&self, identity: &str, now: DateTime<Utc>) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.entry(identity.to_string()).or_insert_with(|| {
            tracing::debug!(sender = identity, "Creating session");
            SessionSlot {
                session: Arc::new(Mutex::new(Session::new(identity))),
                last_seen: now,
            }
        });
        slot.last_seen = now;
        Arc::clone(&slot.session)
    }

    /// Fetch an existing session without touching it.
    pub async fn get(&self, identity: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(identity)
            .map(|slot| Arc::clone(&slot.session))
    }

    /// Remove sessions idle since before `now - max_idle`. Sessions a handler
    /// is currently holding are kept regardless of age.
    pub async fn sweep(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|idle| now.checked_sub_signed(idle))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.last_seen >= cutoff
                || Arc::strong_count(&slot.session) > 1
                || slot.session.try_lock().is_err()
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Periodically drop idle sessions and stale rate-limit entries.
pub fn spawn_sweep_task(
    registry: Arc<SessionRegistry>,
    limiter: Arc<RateLimiter>,
    every: Duration,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;
            let removed = registry.sweep(Utc::now(), ttl).await;
            let pruned = limiter.prune();
            if removed > 0 || pruned > 0 {
                tracing::info!(
                    sessions_removed = removed,
                    limiter_entries_pruned = pruned,
                    "Session sweep"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::SessionState;

    const TTL: Duration = Duration::from_secs(24 * 3600);

    #[tokio::test]
    async fn get_or_create_returns_same_session() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("42").await;
        let b = registry.get_or_create("42").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.lock().await.state, SessionState::Idle);
        assert_eq!(a.lock().await.identity, "42");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_removes_idle_and_keeps_recent() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        drop(registry.get_or_create_at("stale", now - chrono::Duration::hours(25)).await);
        drop(registry.get_or_create_at("fresh", now - chrono::Duration::hours(1)).await);

        let removed = registry.sweep(now, TTL).await;
        assert_eq!(removed, 1);
        assert!(registry.get("stale").await.is_none());
        assert!(registry.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn touching_refreshes_activity() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        drop(registry.get_or_create_at("u", now - chrono::Duration::hours(30)).await);
        drop(registry.get_or_create_at("u", now - chrono::Duration::minutes(5)).await);
        assert_eq!(registry.sweep(now, TTL).await, 0);
    }

    #[tokio::test]
    async fn sweep_skips_sessions_in_use() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        let handle = registry
            .get_or_create_at("busy", now - chrono::Duration::hours(48))
            .await;
        let _guard = handle.lock().await;

        assert_eq!(registry.sweep(now, TTL).await, 0);
        assert!(registry.get("busy").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_task_prunes_limiter() {
        let registry = Arc::new(SessionRegistry::new());
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_millis(1)));
        limiter.allow("someone");

        let task = spawn_sweep_task(
            Arc::clone(&registry),
            Arc::clone(&limiter),
            Duration::from_secs(10),
            TTL,
        );
        // The limiter runs on std Instant, which the paused clock does not move.
        std::thread::sleep(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(limiter.tracked(), 0);
        task.abort();
    }
}
