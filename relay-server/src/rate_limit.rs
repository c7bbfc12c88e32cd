//! Per-client request rate limiting.
//!
//! [`RateLimiter`] is the injected component the HTTP layer talks to. It
//! delegates counting to a [`RateLimitStore`], so the in-memory sliding
//! window here can be swapped for a shared backend without touching the
//! middleware.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for rate limiting.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window.
    pub max_requests: u32,
    /// Length of the sliding window.
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether this request may proceed.
    pub allowed: bool,
    /// Configured maximum for the window.
    pub limit: u32,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Time until the oldest counted request leaves the window.
    pub reset_after: Duration,
}

/// Rate limit storage failure.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend error: {0}")]
    Backend(String),
}

/// Storage backend for per-key request counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Check `key` against `config` and, if allowed, record the request.
    ///
    /// Check and record must happen atomically with respect to other calls
    /// for the same key. Rejected requests are not recorded.
    async fn check_and_record(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError>;

    /// Drop keys with no requests inside `window`. Returns how many were removed.
    async fn prune(&self, window: Duration) -> Result<usize, RateLimitError>;
}

/// In-memory sliding-window log keyed by client.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Drop timestamps that are at least `window` old.
fn expire(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = hits.front() {
        if now.duration_since(oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn check_and_record(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let hits = clients.entry(key.to_string()).or_default();

        expire(hits, now, config.window);

        let until_oldest_expires = |hits: &VecDeque<Instant>| {
            hits.front()
                .map(|&oldest| config.window.saturating_sub(now.duration_since(oldest)))
                .unwrap_or(config.window)
        };

        if hits.len() >= config.max_requests as usize {
            return Ok(RateLimitResult {
                allowed: false,
                limit: config.max_requests,
                remaining: 0,
                reset_after: until_oldest_expires(hits),
            });
        }

        hits.push_back(now);

        Ok(RateLimitResult {
            allowed: true,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(hits.len() as u32),
            reset_after: until_oldest_expires(hits),
        })
    }

    async fn prune(&self, window: Duration) -> Result<usize, RateLimitError> {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let before = clients.len();

        clients.retain(|_, hits| {
            expire(hits, now, window);
            !hits.is_empty()
        });

        Ok(before - clients.len())
    }
}

/// Rate limiter shared by every request.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    /// Rate limiter backed by a fresh in-memory store.
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(config, Arc::new(InMemoryRateLimitStore::new()))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request from `key`.
    pub async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        self.store.check_and_record(key, &self.config).await
    }

    /// Start a background task that prunes idle keys every `interval`.
    pub fn start_cleanup_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.store.prune(self.config.window).await {
                    Ok(removed) => debug!(removed = removed, "rate_limit_pruned"),
                    Err(e) => warn!(error = %e, "rate_limit_prune_failed"),
                }
            }
        })
    }
}
