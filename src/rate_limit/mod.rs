//! Fixed-window admission control.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::backend::KeyValueBackend;
use crate::error::{CadenceError, Result};

pub const DEFAULT_RATE_LIMIT: u32 = 20;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Source of the current wall-clock time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Counts requests per subject in fixed, independent windows.
///
/// A burst straddling a window boundary can admit up to twice the limit.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Arc<dyn KeyValueBackend>,
    limit: u32,
    window: Duration,
    clock: Clock,
}

impl RateLimiter {
    pub fn new(backend: Arc<dyn KeyValueBackend>, limit: u32, window: Duration) -> Result<Self> {
        if window.as_secs() == 0 {
            return Err(CadenceError::Configuration(
                "rate limit window must be at least one second".into(),
            ));
        }
        Ok(Self {
            backend,
            limit,
            window,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the clock (tests).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record one request for `subject` and report whether it is admitted.
    pub async fn allow(&self, subject: &str) -> Result<bool> {
        let key = self.window_key(subject);
        let count = self.backend.increment(&key).await?;
        if count == 1 {
            self.backend.expire(&key, self.window).await?;
        }
        let allowed = count <= i64::from(self.limit);
        if !allowed {
            warn!(subject, count, limit = self.limit, "rate limit exceeded");
        }
        Ok(allowed)
    }

    /// `rate:{subject}:{window_index}`
    pub fn window_key(&self, subject: &str) -> String {
        let now = (self.clock)().timestamp().max(0) as u64;
        let index = now / self.window.as_secs();
        format!("rate:{subject}:{index}")
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::TimeZone;

    fn fixed_clock(secs: i64) -> Clock {
        Arc::new(move || Utc.timestamp_opt(secs, 0).single().unwrap())
    }

    #[test]
    fn window_key_uses_floor_division() {
        let limiter = RateLimiter::new(Arc::new(MemoryBackend::new()), 20, DEFAULT_RATE_WINDOW)
            .unwrap()
            .with_clock(fixed_clock(179));
        assert_eq!(limiter.window_key("conv-1"), "rate:conv-1:2");
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = RateLimiter::new(Arc::new(MemoryBackend::new()), 20, Duration::ZERO).unwrap_err();
        assert!(matches!(err, CadenceError::Configuration(_)));
    }

    #[tokio::test]
    async fn allows_exactly_limit_per_window() {
        let limiter = RateLimiter::new(Arc::new(MemoryBackend::new()), 3, DEFAULT_RATE_WINDOW)
            .unwrap()
            .with_clock(fixed_clock(600));
        for _ in 0..3 {
            assert!(limiter.allow("alice").await.unwrap());
        }
        assert!(!limiter.allow("alice").await.unwrap());
        assert!(limiter.allow("bob").await.unwrap());
    }
}
