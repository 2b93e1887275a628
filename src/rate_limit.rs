use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

use crate::models::Id;

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window { entry.pop_front(); } else { break; }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub booking_limit: usize,
    pub booking_window: Duration,
    pub message_limit: usize,
    pub message_window: Duration,
    pub upload_limit: usize,
    pub upload_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize { std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default) }
        fn dur_env(name: &str, default: u64) -> Duration { Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)) }
        Self {
            booking_limit: usize_env("RL_BOOKING_LIMIT", 10),
            booking_window: dur_env("RL_BOOKING_WINDOW", 3600),
            message_limit: usize_env("RL_MESSAGE_LIMIT", 30),
            message_window: dur_env("RL_MESSAGE_WINDOW", 60),
            upload_limit: usize_env("RL_UPLOAD_LIMIT", 20),
            upload_window: dur_env("RL_UPLOAD_WINDOW", 3600),
        }
    }
}

/// High level guard used by handlers, keyed by account id.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }

    pub fn from_env() -> Self {
        let enabled = std::env::var("RL_DISABLED").map(|v| v != "1").unwrap_or(true);
        Self::new(InMemoryRateLimiter::new(enabled), RateLimitConfig::from_env())
    }

    pub fn allow_booking(&self, user: Id) -> bool { self.limiter.check(&format!("booking:{user}"), self.cfg.booking_limit, self.cfg.booking_window) }
    pub fn allow_message(&self, user: Id) -> bool { self.limiter.check(&format!("message:{user}"), self.cfg.message_limit, self.cfg.message_window) }
    pub fn allow_upload(&self, user: Id) -> bool { self.limiter.check(&format!("upload:{user}"), self.cfg.upload_limit, self.cfg.upload_window) }
}
