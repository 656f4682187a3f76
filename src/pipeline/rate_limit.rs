//! Sliding-window admission control.
//!
//! State lives in this process only. Several replicas behind a load balancer
//! each keep their own windows, so the effective limit scales with the
//! replica count unless an external shared counter is put in front.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bucket shared by every caller without a user id.
pub const ANONYMOUS_BUCKET: &str = "anonymous";

/// Identity count above which expired buckets are swept on the next check.
const SWEEP_THRESHOLD: usize = 10_000;

/// Time source for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    max_requests: usize,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, max_requests: usize, window: Duration) -> Self {
        Self {
            clock,
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(max_requests: usize, window: Duration) -> Self {
        Self::new(Arc::new(SystemClock), max_requests, window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or deny one request. Call at most once per incoming request:
    /// an admitted call is recorded, a denied one is not.
    pub fn is_allowed(&self, user_id: Option<&str>) -> bool {
        let key = user_id.unwrap_or(ANONYMOUS_BUCKET);
        let now = self.clock.now();
        let window = self.window;

        let mut windows = self.windows.lock();

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, stamps| {
                stamps
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
        }

        let stamps = windows.entry(key.to_string()).or_default();
        while stamps
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= window)
        {
            stamps.pop_front();
        }

        if stamps.len() >= self.max_requests {
            tracing::debug!(user = key, in_window = stamps.len(), "Rate limit reached");
            return false;
        }

        stamps.push_back(now);
        true
    }

    /// Number of identities currently holding a window.
    pub fn tracked_identities(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    fn limiter(max: usize) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        (RateLimiter::new(Arc::new(clock.clone()), max, WINDOW), clock)
    }

    #[test]
    fn test_denies_request_past_the_limit() {
        let (limiter, _clock) = limiter(3);

        for _ in 0..3 {
            assert!(limiter.is_allowed(Some("user-1")));
        }
        assert!(!limiter.is_allowed(Some("user-1")));
    }

    #[test]
    fn test_allows_again_after_window_elapses() {
        let (limiter, clock) = limiter(2);

        assert!(limiter.is_allowed(Some("user-1")));
        assert!(limiter.is_allowed(Some("user-1")));
        assert!(!limiter.is_allowed(Some("user-1")));

        clock.advance(WINDOW);
        assert!(limiter.is_allowed(Some("user-1")));
    }

    #[test]
    fn test_window_slides_per_request() {
        let (limiter, clock) = limiter(2);

        assert!(limiter.is_allowed(Some("u")));
        clock.advance(Duration::from_secs(10 * 60));
        assert!(limiter.is_allowed(Some("u")));
        assert!(!limiter.is_allowed(Some("u")));

        // First request leaves the window, the second is still inside
        clock.advance(Duration::from_secs(5 * 60));
        assert!(limiter.is_allowed(Some("u")));
        assert!(!limiter.is_allowed(Some("u")));
    }

    #[test]
    fn test_denial_does_not_extend_the_window() {
        let (limiter, clock) = limiter(1);

        assert!(limiter.is_allowed(Some("u")));
        clock.advance(Duration::from_secs(14 * 60));
        assert!(!limiter.is_allowed(Some("u")));

        // Had the denied call been recorded this would still be blocked
        clock.advance(Duration::from_secs(60));
        assert!(limiter.is_allowed(Some("u")));
    }

    #[test]
    fn test_identities_are_independent() {
        let (limiter, _clock) = limiter(1);

        assert!(limiter.is_allowed(Some("alice")));
        assert!(limiter.is_allowed(Some("bob")));
        assert!(!limiter.is_allowed(Some("alice")));
        assert_eq!(limiter.tracked_identities(), 2);
    }

    #[test]
    fn test_anonymous_callers_share_a_bucket() {
        let (limiter, _clock) = limiter(1);

        assert!(limiter.is_allowed(None));
        assert!(!limiter.is_allowed(None));
        assert!(!limiter.is_allowed(Some(ANONYMOUS_BUCKET)));
    }

    #[test]
    fn test_zero_limit_denies_everything() {
        let (limiter, _clock) = limiter(0);
        assert!(!limiter.is_allowed(Some("u")));
    }
}
