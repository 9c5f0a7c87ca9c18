//! Sliding-window rate limit accounting (§4.1).
//!
//! Each crawler adapter and each org/platform pair in the posting path owns
//! one [`RateLimiter`]: three concentric sliding windows (minute/hour/day),
//! a minimum inter-request delay, and an exponential backoff that grows with
//! recorded failures. `acquire` suspends the caller for exactly as long as
//! needed and never refuses -- callers absorb load by waiting, per §5's
//! backpressure model.
//!
//! The lock is held only to compute the wait and to append the timestamp;
//! the actual sleep happens outside the critical section so a slow waiter
//! never blocks other callers from observing the window state.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Tunables for one [`RateLimiter`]. Mirrors the platform-specific configs
/// in spec §4.3 (Twitter v2 free tier ~4/min, Reddit OAuth ~30/min, Quora
/// ~10/min with a 3s floor, SerpAPI ~10/min).
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub requests_per_minute: Option<u32>,
    pub requests_per_hour: Option<u32>,
    pub requests_per_day: Option<u32>,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: Some(60),
            requests_per_hour: None,
            requests_per_day: None,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RateLimiterConfig {
    /// Twitter API v2 free tier: roughly 4 requests/minute.
    pub fn twitter_free_tier() -> Self {
        Self {
            requests_per_minute: Some(4),
            requests_per_hour: None,
            requests_per_day: None,
            min_delay: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Reddit OAuth: roughly 30 requests/minute (60/min app-wide budget halved
    /// to leave headroom for posting calls on the same credentials).
    pub fn reddit_oauth() -> Self {
        Self {
            requests_per_minute: Some(30),
            min_delay: Duration::from_millis(500),
            ..Default::default()
        }
    }

    /// Quora HTML scraping: ~10 requests/minute with a 3s floor between hits.
    pub fn quora_scrape() -> Self {
        Self {
            requests_per_minute: Some(10),
            min_delay: Duration::from_secs(3),
            ..Default::default()
        }
    }

    /// SerpAPI (Google search): ~10 requests/minute.
    pub fn serpapi() -> Self {
        Self {
            requests_per_minute: Some(10),
            min_delay: Duration::from_secs(1),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct RateLimiterState {
    minute_window: VecDeque<Instant>,
    hour_window: VecDeque<Instant>,
    day_window: VecDeque<Instant>,
    consecutive_failures: u32,
    last_request: Option<Instant>,
}

/// Point-in-time counters and configured ceilings for one limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub name: String,
    pub requests_last_minute: usize,
    pub requests_last_hour: usize,
    pub requests_last_day: usize,
    pub minute_limit: Option<u32>,
    pub hour_limit: Option<u32>,
    pub day_limit: Option<u32>,
    pub consecutive_failures: u32,
}

/// A named sliding-window rate limiter. Not reentrant: never call `acquire`
/// recursively while another call from the same task is suspended in it.
pub struct RateLimiter {
    name: String,
    config: RateLimiterConfig,
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(RateLimiterState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire permission to make one request, suspending for as long as the
    /// windows, the minimum delay, and any backoff require. Returns the time
    /// actually waited.
    pub async fn acquire(&self) -> Duration {
        let wait = {
            let mut state = self.state.lock().await;
            self.calculate_wait(&mut state)
        };

        if wait > Duration::ZERO {
            tracing::debug!(limiter = %self.name, wait_ms = wait.as_millis() as u64, "rate limiter waiting");
            tokio::time::sleep(wait).await;
        }

        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.minute_window.push_back(now);
        if self.config.requests_per_hour.is_some() {
            state.hour_window.push_back(now);
        }
        if self.config.requests_per_day.is_some() {
            state.day_window.push_back(now);
        }
        state.last_request = Some(now);

        wait
    }

    fn calculate_wait(&self, state: &mut RateLimiterState) -> Duration {
        let now = Instant::now();
        let mut waits: Vec<Duration> = Vec::new();

        if let Some(limit) = self.config.requests_per_minute {
            waits.push(Self::window_wait(
                &mut state.minute_window,
                now,
                Duration::from_secs(60),
                limit,
            ));
        }
        if let Some(limit) = self.config.requests_per_hour {
            waits.push(Self::window_wait(
                &mut state.hour_window,
                now,
                Duration::from_secs(3600),
                limit,
            ));
        }
        if let Some(limit) = self.config.requests_per_day {
            waits.push(Self::window_wait(
                &mut state.day_window,
                now,
                Duration::from_secs(86400),
                limit,
            ));
        }

        if let Some(last) = state.last_request {
            let since_last = now.saturating_duration_since(last);
            if since_last < self.config.min_delay {
                waits.push(self.config.min_delay - since_last);
            }
        }

        if state.consecutive_failures > 0 {
            let backoff_secs = self.config.min_delay.as_secs_f64()
                * self
                    .config
                    .backoff_multiplier
                    .powi(state.consecutive_failures as i32);
            let backoff = Duration::from_secs_f64(backoff_secs).min(self.config.max_delay);
            waits.push(backoff);
        }

        waits.into_iter().max().unwrap_or(Duration::ZERO)
    }

    /// Purge entries older than `window` and, if the window is at capacity,
    /// return how long until the oldest entry ages out.
    fn window_wait(
        window: &mut VecDeque<Instant>,
        now: Instant,
        window_len: Duration,
        max_requests: u32,
    ) -> Duration {
        while let Some(&oldest) = window.front() {
            if now.saturating_duration_since(oldest) >= window_len {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= max_requests as usize {
            if let Some(&oldest) = window.front() {
                let frees_at = oldest + window_len;
                return frees_at.saturating_duration_since(now) + Duration::from_millis(100);
            }
        }

        Duration::ZERO
    }

    /// Reset the consecutive-failure counter after a successful request.
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_failures = 0;
    }

    /// Record a failed request, growing the next backoff delay.
    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_failures += 1;
        tracing::warn!(limiter = %self.name, failures = state.consecutive_failures, "rate limiter recorded failure");
    }

    /// Record an explicit rate-limit response from the platform (heavier
    /// penalty than a generic failure: +2 instead of +1).
    pub async fn record_rate_limit_hit(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_failures += 2;
        tracing::warn!(limiter = %self.name, failures = state.consecutive_failures, "rate limiter hit platform rate limit");
    }

    /// Current counters, with lazily-purged windows.
    pub async fn stats(&self) -> RateLimiterStats {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        Self::window_wait(&mut state.minute_window, now, Duration::from_secs(60), u32::MAX);
        Self::window_wait(&mut state.hour_window, now, Duration::from_secs(3600), u32::MAX);
        Self::window_wait(&mut state.day_window, now, Duration::from_secs(86400), u32::MAX);

        RateLimiterStats {
            name: self.name.clone(),
            requests_last_minute: state.minute_window.len(),
            requests_last_hour: state.hour_window.len(),
            requests_last_day: state.day_window.len(),
            minute_limit: self.config.requests_per_minute,
            hour_limit: self.config.requests_per_hour,
            day_limit: self.config.requests_per_day,
            consecutive_failures: state.consecutive_failures,
        }
    }

    /// Clear all window/backoff state.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = RateLimiterState::default();
    }
}

/// A named registry of rate limiters, one per platform adapter (or per
/// org+platform in the posting path). Limiters are created lazily on first
/// use and then reused for the lifetime of the registry.
#[derive(Default)]
pub struct RateLimiterRegistry {
    limiters: Mutex<HashMap<String, std::sync::Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the limiter for `name`, creating it with `config` if absent.
    /// `config` is ignored if a limiter with this name already exists.
    pub async fn get_or_create(
        &self,
        name: &str,
        config: RateLimiterConfig,
    ) -> std::sync::Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().await;
        limiters
            .entry(name.to_string())
            .or_insert_with(|| std::sync::Arc::new(RateLimiter::new(name, config)))
            .clone()
    }

    pub async fn stats_all(&self) -> Vec<RateLimiterStats> {
        let limiters = self.limiters.lock().await;
        let mut out = Vec::with_capacity(limiters.len());
        for limiter in limiters.values() {
            out.push(limiter.stats().await);
        }
        out
    }
}
