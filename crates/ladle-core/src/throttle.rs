//! Per-domain request spacing for polite fetching.
//!
//! Wraps any [`Fetcher`] so that requests to the same domain start at least
//! `delay` (plus optional jitter) apart, however many extraction tasks share
//! the wrapper. Different domains never wait on each other.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ladle_core::throttle::{ThrottleConfig, ThrottledFetcher};
//!
//! # use ladle_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<String, ladle_core::error::AppError> { todo!() }
//! # }
//! let config = ThrottleConfig::new(Duration::from_millis(100))
//!     .with_jitter(Duration::from_millis(50));
//! let fetcher = ThrottledFetcher::new(MyFetcher, config);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::AppError;
use crate::traits::Fetcher;

/// Configuration for the throttled fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum spacing between request starts on the same domain.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter)).
    /// `Duration::ZERO` disables it.
    pub jitter: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

impl Default for ThrottleConfig {
    /// 100ms between requests to one domain, no jitter.
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

/// A [`Fetcher`] wrapper that spaces requests per domain.
///
/// Each call reserves the next free start time for its domain under a short
/// lock, then sleeps until that time without holding the lock.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    /// Start time handed to the most recent request per domain key.
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Domain key for a URL (`scheme://host:port`).
    fn domain_key(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?;
        let port = url
            .port_or_known_default()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Some(format!("{}://{}{}", url.scheme(), host, port))
    }

    /// Reserve a start time for `domain` and return it.
    async fn reserve(&self, domain: &str) -> Instant {
        let now = Instant::now();
        let mut slots = self.next_slot.lock().await;
        let start = match slots.get(domain) {
            Some(&previous) => (previous + self.config.effective_delay()).max(now),
            None => now,
        };
        slots.insert(domain.to_string(), start);
        start
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(domain) = Self::domain_key(url) {
            let start = self.reserve(&domain).await;
            let wait = start.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tracing::debug!(%domain, wait_ms = wait.as_millis() as u64, "Throttling request");
                tokio::time::sleep_until(start).await;
            }
        }
        self.inner.fetch(url).await
    }
}

// Jitter from a xorshift over the clock; not worth the `rand` crate.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
        | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
