//! Sliding-window admission control per user.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Admits at most `limit` requests per identity inside any trailing `window`.
///
/// Rejected requests are not recorded, so a client hammering the bot does not
/// extend its own lockout.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject a request from `identity` now.
    pub fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Instant::now())
    }

    /// Admit or reject a request from `identity` at `now`.
    pub fn allow_at(&self, identity: &str, now: Instant) -> bool {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let stamps = requests.entry(identity.to_string()).or_default();

        let cutoff = now.checked_sub(self.window);
        while let Some(&oldest) = stamps.front() {
            match cutoff {
                Some(cutoff) if oldest <= cutoff => {
                    stamps.pop_front();
                }
                _ => break,
            }
        }

        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Forget identities with no admissions inside the window.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    pub fn prune_at(&self, now: Instant) -> usize {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let before = requests.len();
        let window = self.window;
        requests.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < window)
        });
        before - requests.len()
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn admits_exactly_limit_within_window() {
        let limiter = RateLimiter::new(10, WINDOW);
        let start = Instant::now();
        for i in 0..10 {
            assert!(limiter.allow_at("u", start + Duration::from_secs(i)), "request {i}");
        }
        assert!(!limiter.allow_at("u", start + Duration::from_secs(30)));
        assert!(!limiter.allow_at("u", start + Duration::from_secs(59)));
    }

    #[test]
    fn fresh_request_after_window_succeeds() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();
        assert!(limiter.allow_at("u", start));
        assert!(limiter.allow_at("u", start));
        assert!(!limiter.allow_at("u", start + Duration::from_secs(1)));
        assert!(limiter.allow_at("u", start + WINDOW));
    }

    #[test]
    fn rejected_requests_are_not_recorded() {
        let limiter = RateLimiter::new(1, WINDOW);
        let start = Instant::now();
        assert!(limiter.allow_at("u", start));
        // Rejections inside the window must not push the window forward.
        assert!(!limiter.allow_at("u", start + Duration::from_secs(50)));
        assert!(limiter.allow_at("u", start + Duration::from_secs(61)));
    }

    #[test]
    fn identities_are_independent() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = Instant::now();
        assert!(limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
        assert!(!limiter.allow_at("a", now));
    }

    #[test]
    fn prune_drops_idle_identities() {
        let limiter = RateLimiter::new(5, WINDOW);
        let start = Instant::now();
        limiter.allow_at("old", start);
        limiter.allow_at("new", start + Duration::from_secs(100));

        let removed = limiter.prune_at(start + Duration::from_secs(120));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_quota() {
        let limiter = Arc::new(RateLimiter::new(10, WINDOW));
        let now = Instant::now();
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.allow_at("u", now))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 10);
    }
}
