//! Named crawl sources, each polled on its own cadence (§4.4).
//!
//! A [`CrawlScheduler`] owns one [`crate::automation::Runtime`] and spawns
//! one loop per registered, enabled source. Each loop runs its first crawl
//! immediately on start, then wakes on its `CrawlFrequency` interval (plus
//! jitter, so concurrently-registered sources don't all fire at once), runs
//! one crawl, updates that source's [`CrawlJobStatus`], and hands the raw
//! result to a [`CrawlResultHandler`]. A single source's crawl failing never
//! stops its loop or any other.

use super::Crawler;
use crate::automation::{LoopScheduler, Runtime};
use crate::model::CrawlResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How often a crawl source is polled.
///
/// `FourTimesDaily` and `EverySixHours` are intentionally the same interval:
/// the source material aliases them rather than guaranteeing specific
/// wall-clock firing times, and nothing downstream depends on a phase
/// guarantee, so both resolve to a plain 6-hour interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlFrequency {
    Hourly,
    EverySixHours,
    Daily,
    TwiceDaily,
    FourTimesDaily,
    Weekly,
}

impl CrawlFrequency {
    pub fn interval(self) -> Duration {
        match self {
            CrawlFrequency::Hourly => Duration::from_secs(3600),
            CrawlFrequency::EverySixHours | CrawlFrequency::FourTimesDaily => {
                Duration::from_secs(6 * 3600)
            }
            CrawlFrequency::TwiceDaily => Duration::from_secs(12 * 3600),
            CrawlFrequency::Daily => Duration::from_secs(24 * 3600),
            CrawlFrequency::Weekly => Duration::from_secs(7 * 24 * 3600),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CrawlFrequency::Hourly => "hourly",
            CrawlFrequency::EverySixHours => "every_6_hours",
            CrawlFrequency::Daily => "daily",
            CrawlFrequency::TwiceDaily => "twice_daily",
            CrawlFrequency::FourTimesDaily => "four_times_daily",
            CrawlFrequency::Weekly => "weekly",
        }
    }
}

impl std::str::FromStr for CrawlFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(CrawlFrequency::Hourly),
            "every_6_hours" => Ok(CrawlFrequency::EverySixHours),
            "daily" => Ok(CrawlFrequency::Daily),
            "twice_daily" => Ok(CrawlFrequency::TwiceDaily),
            "four_times_daily" => Ok(CrawlFrequency::FourTimesDaily),
            "weekly" => Ok(CrawlFrequency::Weekly),
            other => Err(format!("unknown crawl frequency: {other}")),
        }
    }
}

/// One configured crawl source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub name: String,
    pub platform: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
    pub frequency: CrawlFrequency,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_limit() -> u32 {
    100
}
fn default_enabled() -> bool {
    true
}

/// Running counters and last outcome for one source's job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlJobStatus {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    /// `"success"`, `"partial"` (posts found alongside errors), or `"failed"`.
    pub last_status: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error_count: usize,
}

/// Receives the raw result of every completed crawl job.
///
/// Implemented by [`super::processor::CrawlProcessor`] in production; tests
/// can implement it directly to assert on what the scheduler produced.
#[async_trait]
pub trait CrawlResultHandler: Send + Sync {
    async fn handle(&self, config_name: &str, result: CrawlResult);
}

struct CrawlEntry {
    config: CrawlConfig,
    crawler: Arc<dyn Crawler>,
    status: CrawlJobStatus,
}

/// Schedules and runs all registered crawl sources.
pub struct CrawlScheduler {
    entries: Arc<Mutex<HashMap<String, CrawlEntry>>>,
    runtime: Runtime,
    paused: Arc<AtomicBool>,
    running: bool,
}

impl CrawlScheduler {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            runtime: Runtime::new(),
            paused: Arc::new(AtomicBool::new(false)),
            running: false,
        }
    }

    /// Register (or replace) a crawl source. Safe to call before or after
    /// [`start`](Self::start); sources added after start are not
    /// automatically picked up until the scheduler restarts.
    pub async fn register(&self, config: CrawlConfig, crawler: Arc<dyn Crawler>) {
        let name = config.name.clone();
        let mut entries = self.entries.lock().await;
        entries.insert(
            name,
            CrawlEntry {
                config,
                crawler,
                status: CrawlJobStatus::default(),
            },
        );
    }

    /// Start one polling loop per enabled, registered source.
    pub async fn start(&mut self, handler: Arc<dyn CrawlResultHandler>) {
        if self.running {
            return;
        }
        self.running = true;
        self.paused.store(false, Ordering::SeqCst);

        let names: Vec<String> = {
            let entries = self.entries.lock().await;
            entries
                .values()
                .filter(|e| e.config.enabled)
                .map(|e| e.config.name.clone())
                .collect()
        };

        for name in names {
            let entries = self.entries.clone();
            let paused = self.paused.clone();
            let handler = handler.clone();
            let cancel = self.runtime.cancel_token();

            let (interval, crawler, job_name) = {
                let guard = entries.lock().await;
                let entry = guard.get(&name).expect("just listed");
                (
                    entry.config.frequency.interval(),
                    entry.crawler.clone(),
                    entry.config.name.clone(),
                )
            };

            let loop_scheduler =
                LoopScheduler::new(interval, Duration::from_secs(0), Duration::from_secs(30));

            self.runtime.spawn(format!("crawl-{job_name}"), async move {
                let _ = crawler.initialize().await;
                let mut first = true;
                loop {
                    if first {
                        first = false;
                    } else {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = loop_scheduler.tick() => {}
                        }
                    }
                    if cancel.is_cancelled() {
                        break;
                    }
                    if paused.load(Ordering::SeqCst) {
                        continue;
                    }

                    let (keywords, subreddits, limit) = {
                        let guard = entries.lock().await;
                        match guard.get(&job_name) {
                            Some(e) => (
                                e.config.keywords.clone(),
                                e.config.subreddits.clone(),
                                e.config.limit,
                            ),
                            None => break,
                        }
                    };

                    let outcome = if keywords.is_empty() {
                        crawler.get_recent(&subreddits, limit).await
                    } else {
                        crawler.search(&keywords, Some(&subreddits), limit).await
                    };

                    let mut guard = entries.lock().await;
                    let Some(entry) = guard.get_mut(&job_name) else {
                        break;
                    };
                    entry.status.total_runs += 1;
                    entry.status.last_run_at = Some(Utc::now());

                    match outcome {
                        Ok(result) => {
                            entry.status.last_error_count = result.errors.len();
                            if !result.errors.is_empty() && result.posts.is_empty() {
                                entry.status.failed_runs += 1;
                                entry.status.last_status = Some("failed".to_string());
                            } else if !result.errors.is_empty() {
                                entry.status.successful_runs += 1;
                                entry.status.last_status = Some("partial".to_string());
                            } else {
                                entry.status.successful_runs += 1;
                                entry.status.last_status = Some("success".to_string());
                            }
                            drop(guard);
                            handler.handle(&job_name, result).await;
                        }
                        Err(e) => {
                            entry.status.failed_runs += 1;
                            entry.status.last_status = Some("failed".to_string());
                            entry.status.last_error_count = 1;
                            tracing::error!(source = %job_name, error = %e, "crawl job failed");
                        }
                    }
                }
                let _ = crawler.close().await;
            });
        }
    }

    /// Gracefully stop all polling loops.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.runtime.shutdown().await;
        self.running = false;
    }

    /// Suspend crawl execution without tearing down the loops; each loop
    /// keeps ticking but skips doing any work while paused.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume after [`pause`](Self::pause).
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub async fn get_status(&self, name: &str) -> Option<CrawlJobStatus> {
        let entries = self.entries.lock().await;
        entries.get(name).map(|e| e.status.clone())
    }

    pub async fn list_configs(&self) -> Vec<CrawlConfig> {
        let entries = self.entries.lock().await;
        entries.values().map(|e| e.config.clone()).collect()
    }
}

impl Default for CrawlScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::CrawlHealth;
    use crate::error::CrawlError;
    use std::sync::atomic::AtomicU32;

    struct CountingCrawler {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Crawler for CountingCrawler {
        fn platform_name(&self) -> &str {
            "test"
        }
        async fn initialize(&self) -> Result<(), CrawlError> {
            Ok(())
        }
        async fn close(&self) -> Result<(), CrawlError> {
            Ok(())
        }
        async fn search(
            &self,
            _keywords: &[String],
            _subreddits: Option<&[String]>,
            _limit: u32,
        ) -> Result<CrawlResult, CrawlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CrawlResult {
                platform: "test".to_string(),
                ..Default::default()
            })
        }
        async fn get_recent(
            &self,
            _sources: &[String],
            _limit: u32,
        ) -> Result<CrawlResult, CrawlError> {
            self.search(&[], None, 0).await
        }
        async fn health_check(&self) -> CrawlHealth {
            CrawlHealth {
                platform: "test".to_string(),
                initialized: true,
                status: "ok".to_string(),
            }
        }
    }

    struct NoopHandler;
    #[async_trait]
    impl CrawlResultHandler for NoopHandler {
        async fn handle(&self, _config_name: &str, _result: CrawlResult) {}
    }

    #[test]
    fn four_times_daily_aliases_every_six_hours() {
        assert_eq!(
            CrawlFrequency::FourTimesDaily.interval(),
            CrawlFrequency::EverySixHours.interval()
        );
    }

    #[test]
    fn frequency_roundtrips_through_str() {
        use std::str::FromStr;
        for freq in [
            CrawlFrequency::Hourly,
            CrawlFrequency::EverySixHours,
            CrawlFrequency::Daily,
            CrawlFrequency::TwiceDaily,
            CrawlFrequency::FourTimesDaily,
            CrawlFrequency::Weekly,
        ] {
            assert_eq!(CrawlFrequency::from_str(freq.as_str()).unwrap(), freq);
        }
    }

    #[tokio::test]
    async fn start_runs_job_at_least_once_then_stop() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut scheduler = CrawlScheduler::new();
        scheduler
            .register(
                CrawlConfig {
                    name: "src1".to_string(),
                    platform: "test".to_string(),
                    keywords: vec!["budget".to_string()],
                    subreddits: vec![],
                    frequency: CrawlFrequency::Hourly,
                    limit: 10,
                    enabled: true,
                },
                Arc::new(CountingCrawler {
                    calls: calls.clone(),
                }),
            )
            .await;

        scheduler.start(Arc::new(NoopHandler)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;

        assert!(calls.load(Ordering::SeqCst) >= 1);
        let status = scheduler.get_status("src1").await.unwrap();
        assert_eq!(status.total_runs, status.successful_runs + status.failed_runs);
        assert!(status.total_runs >= 1);
    }

    #[tokio::test]
    async fn pause_skips_execution() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut scheduler = CrawlScheduler::new();
        scheduler
            .register(
                CrawlConfig {
                    name: "src1".to_string(),
                    platform: "test".to_string(),
                    keywords: vec!["budget".to_string()],
                    subreddits: vec![],
                    frequency: CrawlFrequency::Hourly,
                    limit: 10,
                    enabled: true,
                },
                Arc::new(CountingCrawler {
                    calls: calls.clone(),
                }),
            )
            .await;

        scheduler.pause();
        scheduler.start(Arc::new(NoopHandler)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
